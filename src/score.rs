//! Per-match scoring and the repertoire-level Morisita-Horn / Jaccard
//! transforms derived from the accumulated cell sums.

use std::str::FromStr;

use crate::err::CompairrError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Score {
    Product,
    Ratio,
    Min,
    Max,
    Mean,
    #[value(name = "mh")]
    MorisitaHorn,
    Jaccard,
}

impl FromStr for Score {
    type Err = CompairrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "product" => Score::Product,
            "ratio" => Score::Ratio,
            "min" => Score::Min,
            "max" => Score::Max,
            "mean" => Score::Mean,
            "mh" => Score::MorisitaHorn,
            "jaccard" => Score::Jaccard,
            other => {
                return Err(CompairrError::ConflictingOptions(format!(
                    "unknown score function: {other}"
                )))
            }
        })
    }
}

impl Score {
    /// `mh` and `jaccard` are repertoire-level normalizations computed from
    /// the accumulated `product`/`min` cell sums after aggregation; they are
    /// not symmetric per-match increments the way the others are.
    pub fn is_postprocessed(self) -> bool {
        matches!(self, Score::MorisitaHorn | Score::Jaccard)
    }

    /// The per-match sum this score accumulates into a matrix cell while
    /// matches are being collected.
    pub fn underlying_sum(self) -> Score {
        match self {
            Score::MorisitaHorn => Score::Product,
            Score::Jaccard => Score::Min,
            other => other,
        }
    }

    /// Per-match increment for a matched pair with counts `f` (query side)
    /// and `g` (target side).
    pub fn increment(self, f: f64, g: f64) -> f64 {
        match self {
            Score::Product | Score::MorisitaHorn => f * g,
            Score::Ratio => f / g,
            Score::Min | Score::Jaccard => f.min(g),
            Score::Max => f.max(g),
            Score::Mean => (f + g) / 2.0,
        }
    }
}

/// Morisita-Horn index for one cell: `2*sum / ((lambda_s + lambda_t) * c_s * c_t)`.
pub fn morisita_horn(product_sum: f64, count_s: f64, lambda_s: f64, count_t: f64, lambda_t: f64) -> f64 {
    let denom = (lambda_s + lambda_t) * count_s * count_t;
    if denom == 0.0 {
        0.0
    } else {
        2.0 * product_sum / denom
    }
}

/// `lambda_r = sum(count^2) / count_total^2`, the homogeneity term Morisita-Horn needs per repertoire.
pub fn lambda(sum_of_squares: f64, count_total: f64) -> f64 {
    if count_total == 0.0 {
        0.0
    } else {
        sum_of_squares / (count_total * count_total)
    }
}

/// Jaccard index for one cell: `min_sum / (c_s + c_t - min_sum)`.
pub fn jaccard(min_sum: f64, count_s: f64, count_t: f64) -> f64 {
    let denom = count_s + count_t - min_sum;
    if denom == 0.0 {
        0.0
    } else {
        min_sum / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn product_increment_multiplies_counts() {
        assert_eq!(Score::Product.increment(2.0, 3.0), 6.0);
    }

    #[test]
    fn ratio_increment_is_asymmetric() {
        assert_eq!(Score::Ratio.increment(2.0, 4.0), 0.5);
        assert_eq!(Score::Ratio.increment(4.0, 2.0), 2.0);
    }

    #[test]
    fn morisita_horn_self_identity_is_one() {
        // A repertoire against itself: count_s == count_t, lambda_s == lambda_t,
        // and product_sum equals sum(count^2).
        let counts = [2.0, 3.0, 5.0];
        let total: f64 = counts.iter().sum();
        let sum_sq: f64 = counts.iter().map(|c| c * c).sum();
        let lam = lambda(sum_sq, total);
        let mh = morisita_horn(sum_sq, total, lam, total, lam);
        assert!((mh - 1.0).abs() < 1e-9);
    }

    #[test]
    fn jaccard_self_identity_is_one() {
        let counts = [1.0, 1.0, 1.0];
        let total: f64 = counts.iter().sum();
        let min_sum = total;
        let j = jaccard(min_sum, total, total);
        assert!((j - 1.0).abs() < 1e-9);
    }

    #[test]
    fn jaccard_bounds_hold() {
        let j = jaccard(2.0, 5.0, 5.0);
        assert!((0.0..=1.0).contains(&j));
    }
}
