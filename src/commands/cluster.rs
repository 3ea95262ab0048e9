//! `compairr cluster`: single-linkage connected components within one
//! repertoire file.

use std::sync::{Arc, Mutex};

use clap::Parser;

use crate::cli::{MatchArgs, RunArgs};
use crate::commands::{self, open_output};
use crate::common::{self, CHUNK_SIZE};
use crate::engine::{find_matches, MatchOptions, TargetIndex};
use crate::output::{self, ClusterMember};
use crate::pool::{self, ChunkCursor, WorkerPool};
use crate::store::GeneRegistries;

const NONE: u32 = u32::MAX;

#[derive(Parser, Debug)]
pub struct Args {
    /// Input AIRR file, or "-" for standard input.
    pub input: String,
    #[command(flatten)]
    pub m: MatchArgs,
    #[command(flatten)]
    pub run: RunArgs,
}

/// Phase 2: single-threaded BFS component labeling over the adjacency list
/// built in phase 1. Returns, in descending-size order, `(head, size)` for
/// each cluster, plus the `next` chain used to walk its members.
fn label_components(adjacency: &[Vec<u32>]) -> (Vec<(u32, u32)>, Vec<u32>) {
    let n = adjacency.len();
    let mut labels = vec![NONE; n];
    let mut next = vec![NONE; n];
    let mut clusters: Vec<(u32, u32)> = Vec::new();

    for u in 0..n {
        if labels[u] != NONE {
            continue;
        }
        let cluster_id = clusters.len() as u32;
        labels[u] = cluster_id;
        let mut tail = u;
        let mut size = 1u32;
        let mut cur = Some(u);
        while let Some(c) = cur {
            for &w in &adjacency[c] {
                let w = w as usize;
                if labels[w] == NONE {
                    labels[w] = cluster_id;
                    next[tail] = w as u32;
                    tail = w;
                    size += 1;
                }
            }
            cur = if next[c] != NONE { Some(next[c] as usize) } else { None };
        }
        clusters.push((u as u32, size));
    }

    clusters.sort_by_key(|&(_, size)| std::cmp::Reverse(size));
    (clusters, next)
}

pub fn run(_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    args.m.validate()?;
    let threads = args.run.validate()?;

    let mut genes = GeneRegistries::default();
    let opts = commands::ingest_options(&args.m, true, Vec::new(), "1");
    let mut set = commands::load_set(&args.input, &opts, &mut genes, "input")?;

    let tables = commands::build_tables_and_fingerprint(args.m.alphabet(), &mut [&mut set], &genes);

    let n = set.clonotypes.len();
    let set = Arc::new(set);
    let target = Arc::new(TargetIndex::build(Arc::clone(&set)));
    let cursor = Arc::new(ChunkCursor::new(n, CHUNK_SIZE));
    let adjacency: Arc<Mutex<Vec<Vec<u32>>>> = Arc::new(Mutex::new(vec![Vec::new(); n]));

    let match_opts = MatchOptions {
        differences: args.m.differences,
        indels: args.m.indels,
        ignore_genes: args.m.ignore_genes,
        alphabet: args.m.alphabet(),
        require_same_repertoire: false,
    };

    tracing::info!(
        "cluster: materializing neighbor edges for {} sequences using {} threads",
        n,
        threads
    );

    {
        let set = Arc::clone(&set);
        let target = Arc::clone(&target);
        let worker_cursor = Arc::clone(&cursor);
        let adjacency = Arc::clone(&adjacency);

        let pool = WorkerPool::new(threads, move |_t| {
            let cursor = &worker_cursor;
            let mut local: Vec<(usize, Vec<u32>)> = Vec::new();
            while let Some(range) = cursor.claim() {
                for qi in range.clone() {
                    let query = &set.clonotypes[qi];
                    let mut edges = Vec::new();
                    find_matches(query, Some(qi as u32), &tables, &target, &match_opts, &mut |t| {
                        edges.push(t)
                    });
                    local.push((qi, edges));
                }
                let mut shared = adjacency.lock().unwrap();
                for (idx, edges) in local.drain(..) {
                    shared[idx] = edges;
                }
                drop(shared);
                cursor.advance(range.len());
            }
        });
        pool::run_with_progress(&pool, &cursor, "cluster");
    }

    let adjacency = Arc::try_unwrap(adjacency).unwrap().into_inner().unwrap();
    let (clusters, next) = label_components(&adjacency);

    let mut members = Vec::new();
    for (cluster_no, &(head, size)) in clusters.iter().enumerate() {
        let mut cur = Some(head);
        while let Some(idx) = cur {
            members.push(ClusterMember {
                cluster_no: cluster_no as u32 + 1,
                cluster_size: size,
                clonotype: set.clonotypes[idx as usize].clone(),
            });
            cur = if next[idx as usize] != NONE {
                Some(next[idx as usize])
            } else {
                None
            };
        }
    }

    let seq_column = commands::seq_column_name(&args.m);
    let out = open_output(&args.run.output)?;
    output::write_clusters(
        out,
        &members,
        &set.repertoires,
        (&genes.v, &genes.j),
        args.m.alphabet(),
        seq_column,
        args.m.ignore_genes,
    )?;

    common::trace_rss_now();
    Ok(())
}
