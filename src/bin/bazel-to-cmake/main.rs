//! bazel-to-cmake CLI

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bazel_to_cmake::ops::translate::{translate, TranslateOptions};

mod cli;

use cli::{pairs, Cli};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("bazel_to_cmake=debug")
    } else {
        EnvFilter::new("bazel_to_cmake=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let source_dir = match cli.source_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    let program = std::env::current_exe().context("failed to locate the running executable")?;

    let opts = TranslateOptions {
        cmake_vars: cli.cmake_vars.into_iter().collect(),
        load_workspace: cli.load_workspace,
        save_workspace: cli.save_workspace,
        cmake_project_name: cli.cmake_project_name,
        cmake_binary_dir: cli.cmake_binary_dir,
        bazel_repo_name: cli.bazel_repo_name,
        source_dir,
        build_rules_output: cli.build_rules_output,
        bazelrc: cli.bazelrc,
        modules: cli.modules,
        ignore_libraries: cli.ignore_libraries,
        repo_mappings: pairs(&cli.repo_mapping),
        target_aliases: pairs(&cli.target_alias),
        include_packages: cli.include_packages,
        exclude_packages: cli.exclude_packages,
        targets: cli.targets,
        declarations: cli.declarations,
        program,
    };

    let outcome = translate(&opts)?;
    if outcome.written {
        tracing::info!("wrote {}", outcome.build_rules_output.display());
    } else {
        tracing::debug!("{} is up to date", outcome.build_rules_output.display());
    }
    Ok(())
}
