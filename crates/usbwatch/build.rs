use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs only needs clap and clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
mod cli;

const BIN: &str = "usbwatch";

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir: PathBuf = std::env::var_os("OUT_DIR")
        .expect("OUT_DIR not set by Cargo")
        .into();

    let mut cmd = cli::Cli::command();
    write_man_pages(&cmd, &out_dir.join("man"));
    write_completions(&mut cmd, &out_dir.join("completions"));
}

/// One page per visible command, named `usbwatch-devices-list.1` and so on.
fn write_man_pages(root: &clap::Command, dir: &Path) {
    ensure_dir(dir);

    let mut pending = vec![root.clone()];
    while let Some(cmd) = pending.pop() {
        let page = dir.join(format!("{}.1", cmd.get_name()));
        let mut buf = Vec::new();
        clap_mangen::Man::new(cmd.clone())
            .render(&mut buf)
            .unwrap_or_else(|e| panic!("rendering {}: {e}", page.display()));
        fs::write(&page, buf).unwrap_or_else(|e| panic!("writing {}: {e}", page.display()));

        let parent = cmd.get_name().to_owned();
        pending.extend(
            cmd.get_subcommands()
                .filter(|sub| !sub.is_hide_set())
                .map(|sub| sub.clone().name(format!("{parent}-{}", sub.get_name()))),
        );
    }
}

/// Pre-generated scripts for packagers; `usbwatch completions` prints the same.
fn write_completions(cmd: &mut clap::Command, dir: &Path) {
    ensure_dir(dir);

    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell] {
        clap_complete::generate_to(shell, cmd, BIN, dir)
            .unwrap_or_else(|e| panic!("generating {shell} completions: {e}"));
    }
}

fn ensure_dir(dir: &Path) {
    fs::create_dir_all(dir).unwrap_or_else(|e| panic!("creating {}: {e}", dir.display()));
}
