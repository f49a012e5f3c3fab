/// Candidate identity unique per process: `<prefix>-pid-<process id>`.
pub fn process_identity(prefix: &str) -> String {
    format!("{}-pid-{}", prefix, std::process::id())
}
