//! `compairr deduplicate`: exact-match collapse of clonotypes within each
//! repertoire, summing duplicate counts into one representative per group.

use clap::Parser;

use crate::alphabet::Alphabet;
use crate::cli::{ExactMatchArgs, RunArgs};
use crate::commands::{self, open_output};
use crate::common::{self, CHUNK_SIZE};
use crate::engine::{find_matches, MatchOptions, TargetIndex};
use crate::output;
use crate::store::GeneRegistries;

#[derive(Parser, Debug)]
pub struct Args {
    /// Input AIRR file, or "-" for standard input.
    pub input: String,
    #[command(flatten)]
    pub m: ExactMatchArgs,
    #[command(flatten)]
    pub run: RunArgs,
}

pub fn run(_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    // Thread count is validated for consistency with the other subcommands,
    // but the merge pass below is inherently sequential: each representative's
    // claim over not-yet-assigned rows depends on the first-seen order.
    let _threads = args.run.validate()?;

    let mut genes = GeneRegistries::default();
    let opts = commands::ingest_options_exact(&args.m, false, Vec::new(), "1");
    let mut set = commands::load_set(&args.input, &opts, &mut genes, "input")?;
    let tables = commands::build_tables_and_fingerprint(args.m.alphabet(), &mut [&mut set], &genes);

    let n = set.clonotypes.len();
    tracing::info!("deduplicate: merging exact-match groups among {n} sequences");

    let set = std::sync::Arc::new(set);
    let target = TargetIndex::build(std::sync::Arc::clone(&set));
    let match_opts = MatchOptions {
        differences: 0,
        indels: false,
        ignore_genes: args.m.ignore_genes,
        alphabet: args.m.alphabet(),
        require_same_repertoire: true,
    };

    const UNASSIGNED: u32 = u32::MAX;
    let mut assigned_rep = vec![UNASSIGNED; n];
    let mut group_sum = vec![0u64; n];
    let mut representative_order = Vec::new();

    for i in 0..n {
        if assigned_rep[i] != UNASSIGNED {
            continue;
        }
        assigned_rep[i] = i as u32;
        let mut sum = set.clonotypes[i].count;
        representative_order.push(i as u32);

        find_matches(
            &set.clonotypes[i],
            None,
            &tables,
            &target,
            &match_opts,
            &mut |t_idx| {
                let t = t_idx as usize;
                if t != i && assigned_rep[t] == UNASSIGNED {
                    assigned_rep[t] = i as u32;
                    sum += set.clonotypes[t].count;
                }
            },
        );
        group_sum[i] = sum;

        if (i + 1) % CHUNK_SIZE == 0 || i + 1 == n {
            tracing::info!("deduplicate: {}/{n} sequences processed", i + 1);
        }
    }

    tracing::info!(
        "deduplicate: {} sequences collapsed into {} representatives",
        n,
        representative_order.len()
    );

    let representatives: Vec<_> = representative_order
        .iter()
        .map(|&i| {
            let mut c = set.clonotypes[i as usize].clone();
            c.count = group_sum[i as usize];
            c
        })
        .collect();

    let alphabet: Alphabet = args.m.alphabet();
    let out = open_output(&args.run.output)?;
    output::write_dedup(
        out,
        &representatives,
        &set.repertoires,
        (&genes.v, &genes.j),
        alphabet,
        args.m.ignore_genes,
    )?;

    common::trace_rss_now();
    Ok(())
}
