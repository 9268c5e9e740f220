//! Shell completions generation command.

use std::io::Write as _;

use clap::CommandFactory as _;
use clap_complete::{Generator, Shell};

use crate::cli::Cli;

/// Writes completions for `shell` to stdout.
pub fn generate_completions(shell: Shell) {
    write_completions(shell, &mut std::io::stdout());
    std::io::stdout().flush().ok();
}

fn write_completions<G: Generator>(generator: G, buf: &mut dyn std::io::Write) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_owned();
    clap_complete::generate(generator, &mut cmd, bin_name, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_mention_subcommands() {
        let mut buf = Vec::new();
        write_completions(Shell::Bash, &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("campus"));
        assert!(script.contains("upload"));
        assert!(script.contains("files"));
    }
}
