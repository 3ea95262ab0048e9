//! Tabular emitters for the four commands' result tables, plus the shared
//! pairs stream. All tabular output goes through `csv::WriterBuilder`
//! configured for tab-delimited, unquoted AIRR-style rows.

use std::io::Write;

use csv::WriterBuilder;

use crate::alphabet::Alphabet;
use crate::store::{Clonotype, Registry};

pub fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .has_headers(false)
        .from_writer(writer)
}

/// Dense `repertoire x repertoire` (or `sequence x repertoire`) matrix,
/// emitted as `#\t<col ids...>` then one row per line label.
pub fn write_matrix<W: Write>(
    writer: W,
    row_labels: &[String],
    col_labels: &[String],
    cell: impl Fn(usize, usize) -> f64,
) -> Result<(), anyhow::Error> {
    let mut w = tsv_writer(writer);
    let mut header = vec!["#".to_owned()];
    header.extend(col_labels.iter().cloned());
    w.write_record(&header)?;
    for (r, row_label) in row_labels.iter().enumerate() {
        let mut record = vec![row_label.clone()];
        for c in 0..col_labels.len() {
            record.push(format_score(cell(r, c)));
        }
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

/// Column-triples layout: one `(row_id, col_id, value)` line per cell,
/// selected via `--alternative`.
pub fn write_matrix_alternative<W: Write>(
    writer: W,
    row_header: &str,
    col_header: &str,
    row_labels: &[String],
    col_labels: &[String],
    cell: impl Fn(usize, usize) -> f64,
) -> Result<(), anyhow::Error> {
    let mut w = tsv_writer(writer);
    w.write_record([&format!("#{row_header}"), col_header, "matches"])?;
    for (r, row_label) in row_labels.iter().enumerate() {
        for (c, col_label) in col_labels.iter().enumerate() {
            w.write_record([row_label, col_label, &format_score(cell(r, c))])?;
        }
    }
    w.flush()?;
    Ok(())
}

fn format_score(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.10}")
    }
}

pub struct ClusterMember {
    pub cluster_no: u32,
    pub cluster_size: u32,
    pub clonotype: Clonotype,
}

pub fn write_clusters<W: Write>(
    writer: W,
    members: &[ClusterMember],
    repertoires: &Registry,
    genes: (&Registry, &Registry),
    alphabet: Alphabet,
    seq_column: &str,
    ignore_genes: bool,
) -> Result<(), anyhow::Error> {
    let mut w = tsv_writer(writer);
    let mut header = vec![
        "#cluster_no".to_owned(),
        "cluster_size".to_owned(),
        "repertoire_id".to_owned(),
        "sequence_id".to_owned(),
        "duplicate_count".to_owned(),
    ];
    if !ignore_genes {
        header.push("v_call".to_owned());
        header.push("j_call".to_owned());
    }
    header.push(seq_column.to_owned());
    w.write_record(&header)?;

    for m in members {
        let c = &m.clonotype;
        let mut record = vec![
            m.cluster_no.to_string(),
            m.cluster_size.to_string(),
            repertoires.name(c.repertoire_id_no).to_owned(),
            c.sequence_id.clone().unwrap_or_default(),
            c.count.to_string(),
        ];
        if !ignore_genes {
            record.push(genes.0.name(c.v_gene_no).to_owned());
            record.push(genes.1.name(c.j_gene_no).to_owned());
        }
        record.push(alphabet.decode(&c.seq));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_dedup<W: Write>(
    writer: W,
    representatives: &[Clonotype],
    repertoires: &Registry,
    genes: (&Registry, &Registry),
    alphabet: Alphabet,
    ignore_genes: bool,
) -> Result<(), anyhow::Error> {
    let mut w = tsv_writer(writer);
    for c in representatives {
        let mut record = vec![
            repertoires.name(c.repertoire_id_no).to_owned(),
            c.count.to_string(),
        ];
        if !ignore_genes {
            record.push(genes.0.name(c.v_gene_no).to_owned());
            record.push(genes.1.name(c.j_gene_no).to_owned());
        }
        record.push(alphabet.decode(&c.seq));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

/// One row of the `--pairs` stream: both sides of an accepted match.
pub struct PairRecord {
    pub repertoire_1: String,
    pub sequence_id_1: Option<String>,
    pub count_1: u64,
    pub repertoire_2: String,
    pub sequence_id_2: Option<String>,
    pub count_2: u64,
    pub v_call: Option<(String, String)>,
    pub seq_1: String,
    pub seq_2: String,
    /// Tab-joined `--keep-columns` values for each side, copied through
    /// from the query's and candidate's own `Clonotype.keep`.
    pub keep_1: Option<String>,
    pub keep_2: Option<String>,
    pub distance: Option<u32>,
}

pub fn write_pair<W: Write>(w: &mut csv::Writer<W>, row: &PairRecord) -> Result<(), anyhow::Error> {
    let mut record = vec![
        row.repertoire_1.clone(),
        row.sequence_id_1.clone().unwrap_or_default(),
        row.count_1.to_string(),
        row.repertoire_2.clone(),
        row.sequence_id_2.clone().unwrap_or_default(),
        row.count_2.to_string(),
    ];
    if let Some((v, j)) = &row.v_call {
        record.push(v.clone());
        record.push(j.clone());
    }
    record.push(row.seq_1.clone());
    record.push(row.seq_2.clone());
    if let Some(k) = &row.keep_1 {
        record.push(k.clone());
    }
    if let Some(k) = &row.keep_2 {
        record.push(k.clone());
    }
    if let Some(d) = row.distance {
        record.push(d.to_string());
    }
    w.write_record(&record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_whole_numbers_without_decimals() {
        assert_eq!(format_score(4.0), "4");
    }

    #[test]
    fn formats_fractional_scores_with_precision() {
        assert_eq!(format_score(0.5), "0.5000000000");
    }

    #[test]
    fn matrix_output_has_header_row() {
        let mut buf = Vec::new();
        write_matrix(
            &mut buf,
            &["r1".to_owned(), "r2".to_owned()],
            &["c1".to_owned()],
            |r, _c| r as f64,
        )
        .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("#\tc1\n"));
    }
}
