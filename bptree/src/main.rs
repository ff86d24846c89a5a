use std::io::{self, BufWriter};

use bptree::config::ShellConfig;
use bptree::shell::Shell;
use bptree::storage::BTree;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Logs go to stderr so they do not interleave with shell replies.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bptree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = match ShellConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: database_path={}, growth_batch={}",
        config.database_path.display(),
        config.growth_batch
    );

    let tree = match BTree::open_with(&config.database_path, config.growth_batch) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::error!(
                "Failed to open tree file {}: {e}",
                config.database_path.display()
            );
            std::process::exit(1);
        }
    };

    let mut shell = Shell::new(tree);
    let stdin = io::stdin();
    if let Err(e) = shell.run(stdin.lock(), BufWriter::new(io::stdout())) {
        tracing::error!("Shell I/O error: {e}");
    }

    let mut tree = shell.into_tree();
    if let Err(e) = tree.flush() {
        tracing::error!("Failed to flush tree file: {e}");
        std::process::exit(1);
    }
    tracing::info!("tree file flushed, exiting");
}
