//! Shell snippets for driving real processes in tests.

use std::path::Path;

/// `sh -c <script>` as a command vector.
pub fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// A script that exits with `codes[n]` on its n-th run (0-based), counting
/// runs in `counter`. Runs past the end of `codes` reuse the last code.
pub fn exit_sequence(counter: &Path, codes: &[i32]) -> String {
    let counter = counter.display();
    let mut script = format!(
        "n=$(cat '{counter}' 2>/dev/null || echo 0); echo $((n + 1)) > '{counter}'; case $n in "
    );
    for (i, code) in codes.iter().enumerate() {
        script.push_str(&format!("{i}) exit {code};; "));
    }
    let last = codes.last().copied().unwrap_or(0);
    script.push_str(&format!("*) exit {last};; esac"));
    script
}

/// A script that stays alive until killed, ignoring SIGTERM.
pub fn ignore_term_and_sleep() -> &'static str {
    "trap '' TERM; echo ready; while true; do sleep 0.05; done"
}

/// A script that prints `ready` and then sleeps until terminated.
pub fn sleep_forever() -> &'static str {
    "echo ready; exec sleep 30"
}
