use std::io::Write;

/// Observer for a poll session, for humans only
pub trait Progress: Send + Sync {
    /// First status seen
    fn started(&self, _task_id: &str, _state: &str) {}

    /// One poll cycle is about to wait
    fn tick(&self) {}

    /// Session ended, successfully or not
    fn finished(&self) {}
}

/// Silent progress
pub struct NoProgress;

impl Progress for NoProgress {}

/// Prints the initial state, then one dot per poll cycle on stdout
pub struct DotProgress;

impl Progress for DotProgress {
    fn started(&self, _task_id: &str, state: &str) {
        println!("{}", state);
    }

    fn tick(&self) {
        let mut stdout = std::io::stdout();
        // Progress output is best effort
        let _ = write!(stdout, ".");
        let _ = stdout.flush();
    }

    fn finished(&self) {
        println!();
    }
}
