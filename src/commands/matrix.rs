//! `compairr matrix`: repertoire x repertoire overlap between two AIRR files.

use std::sync::{Arc, Mutex};

use clap::Parser;

use crate::cli::{MatchArgs, RunArgs, ScoringArgs};
use crate::commands::{self, open_output};
use crate::common::{self, CHUNK_SIZE};
use crate::engine::{find_matches, MatchOptions, TargetIndex};
use crate::output::{self, PairRecord};
use crate::pool::{self, ChunkCursor, WorkerPool};
use crate::score::{self, Score};
use crate::store::GeneRegistries;

#[derive(Parser, Debug)]
pub struct Args {
    /// First input AIRR repertoire file, or "-" for standard input.
    pub input1: String,
    /// Second input AIRR repertoire file, or "-" for standard input.
    pub input2: String,
    #[command(flatten)]
    pub m: MatchArgs,
    #[command(flatten)]
    pub scoring: ScoringArgs,
    #[command(flatten)]
    pub run: RunArgs,
}

fn edit_distance(a: &[u8], b: &[u8]) -> u32 {
    if a.len() == b.len() {
        a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as u32
    } else {
        1
    }
}

fn repertoire_totals(set: &crate::store::SequenceSet, n_reps: usize) -> (Vec<f64>, Vec<f64>) {
    let mut totals = vec![0f64; n_reps];
    let mut sumsq = vec![0f64; n_reps];
    for c in &set.clonotypes {
        let r = c.repertoire_id_no as usize;
        totals[r] += c.count as f64;
        sumsq[r] += (c.count as f64).powi(2);
    }
    (totals, sumsq)
}

pub fn run(_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    args.m.validate()?;
    args.scoring.validate(args.m.differences)?;
    let threads = args.run.validate()?;

    if matches!(args.scoring.score, Score::Ratio) {
        tracing::warn!("--score ratio is asymmetric: swapping the two input files changes the result");
    }

    let mut genes = GeneRegistries::default();
    let keep_columns = args.scoring.keep_columns_vec();
    let opts1 = commands::ingest_options(&args.m, false, keep_columns.clone(), "1");
    let opts2 = commands::ingest_options(&args.m, false, keep_columns, "2");
    let mut set1 = commands::load_set(&args.input1, &opts1, &mut genes, "set 1")?;
    let mut set2 = commands::load_set(&args.input2, &opts2, &mut genes, "set 2")?;

    let tables = Arc::new(commands::build_tables_and_fingerprint(
        args.m.alphabet(),
        &mut [&mut set1, &mut set2],
        &genes,
    ));
    let genes = Arc::new(genes);

    let r1 = set1.repertoires.len().max(1);
    let r2 = set2.repertoires.len().max(1);
    let rep1_labels: Vec<String> = (0..r1 as u32).map(|i| set1.repertoires.name(i).to_owned()).collect();
    let rep2_labels: Vec<String> = (0..r2 as u32).map(|i| set2.repertoires.name(i).to_owned()).collect();
    let (totals1, sumsq1) = repertoire_totals(&set1, r1);
    let (totals2, sumsq2) = repertoire_totals(&set2, r2);
    let lambda1: Vec<f64> = totals1
        .iter()
        .zip(sumsq1.iter())
        .map(|(&t, &s)| score::lambda(s, t))
        .collect();
    let lambda2: Vec<f64> = totals2
        .iter()
        .zip(sumsq2.iter())
        .map(|(&t, &s)| score::lambda(s, t))
        .collect();

    let set1 = Arc::new(set1);
    let set2 = Arc::new(set2);
    let target = Arc::new(TargetIndex::build(Arc::clone(&set2)));
    let cursor = Arc::new(ChunkCursor::new(set1.clonotypes.len(), CHUNK_SIZE));
    let matrix = Arc::new(Mutex::new(vec![0f64; r1 * r2]));
    let pairs: Arc<Mutex<Vec<PairRecord>>> = Arc::new(Mutex::new(Vec::new()));

    let match_opts = MatchOptions {
        differences: args.m.differences,
        indels: args.m.indels,
        ignore_genes: args.m.ignore_genes,
        alphabet: args.m.alphabet(),
        require_same_repertoire: false,
    };
    let underlying = args.scoring.score.underlying_sum();
    let want_pairs = args.scoring.pairs.is_some();
    let want_distance = args.scoring.distance;
    let ignore_genes = args.m.ignore_genes;
    let alphabet = args.m.alphabet();

    tracing::info!(
        "matrix: comparing {} query sequences against {} target sequences using {} threads",
        set1.clonotypes.len(),
        set2.clonotypes.len(),
        threads
    );

    {
        let set1 = Arc::clone(&set1);
        let set2 = Arc::clone(&set2);
        let tables = Arc::clone(&tables);
        let target = Arc::clone(&target);
        let worker_cursor = Arc::clone(&cursor);
        let matrix = Arc::clone(&matrix);
        let pairs = Arc::clone(&pairs);
        let genes = Arc::clone(&genes);

        let pool = WorkerPool::new(threads, move |_t| {
            let cursor = &worker_cursor;
            let mut local_matrix = vec![0f64; r1 * r2];
            let mut local_pairs = Vec::new();
            while let Some(range) = cursor.claim() {
                let claimed = range.len();
                for qi in range {
                    let query = &set1.clonotypes[qi];
                    let mut hits = Vec::new();
                    find_matches(query, None, &tables, &target, &match_opts, &mut |t| hits.push(t));
                    for t_idx in hits {
                        let candidate = &set2.clonotypes[t_idx as usize];
                        let inc = underlying.increment(query.count as f64, candidate.count as f64);
                        let cell = query.repertoire_id_no as usize * r2 + candidate.repertoire_id_no as usize;
                        local_matrix[cell] += inc;

                        if want_pairs {
                            local_pairs.push(PairRecord {
                                repertoire_1: set1.repertoires.name(query.repertoire_id_no).to_owned(),
                                sequence_id_1: query.sequence_id.clone(),
                                count_1: query.count,
                                repertoire_2: set2.repertoires.name(candidate.repertoire_id_no).to_owned(),
                                sequence_id_2: candidate.sequence_id.clone(),
                                count_2: candidate.count,
                                v_call: if ignore_genes {
                                    None
                                } else {
                                    Some((
                                        genes.v.name(query.v_gene_no).to_owned(),
                                        genes.j.name(query.j_gene_no).to_owned(),
                                    ))
                                },
                                seq_1: alphabet.decode(&query.seq),
                                seq_2: alphabet.decode(&candidate.seq),
                                keep_1: query.keep.clone(),
                                keep_2: candidate.keep.clone(),
                                distance: want_distance.then(|| edit_distance(&query.seq, &candidate.seq)),
                            });
                        }
                    }
                }
                cursor.advance(claimed);
            }
            let mut shared = matrix.lock().unwrap();
            for (dst, src) in shared.iter_mut().zip(local_matrix.iter()) {
                *dst += src;
            }
            drop(shared);
            if want_pairs {
                pairs.lock().unwrap().extend(local_pairs);
            }
        });
        pool::run_with_progress(&pool, &cursor, "matrix");
    }

    let matrix = Arc::try_unwrap(matrix).unwrap().into_inner().unwrap();
    let cell = |r: usize, c: usize| -> f64 {
        let raw = matrix[r * r2 + c];
        match args.scoring.score {
            Score::MorisitaHorn => score::morisita_horn(raw, totals1[r], lambda1[r], totals2[c], lambda2[c]),
            Score::Jaccard => score::jaccard(raw, totals1[r], totals2[c]),
            _ => raw,
        }
    };

    let out = open_output(&args.run.output)?;
    if args.scoring.alternative {
        output::write_matrix_alternative(
            out,
            "repertoire_id_1",
            "repertoire_id_2",
            &rep1_labels,
            &rep2_labels,
            cell,
        )?;
    } else {
        output::write_matrix(out, &rep1_labels, &rep2_labels, cell)?;
    }

    if let Some(path) = &args.scoring.pairs {
        let mut w = output::tsv_writer(open_output(path)?);
        for row in Arc::try_unwrap(pairs).unwrap().into_inner().unwrap() {
            output::write_pair(&mut w, &row)?;
        }
        w.flush()?;
    }

    common::trace_rss_now();
    Ok(())
}
