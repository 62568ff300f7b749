use std::fmt;

/// One candidate request; `status` is `None` when the call never got a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub path: String,
    pub status: Option<u16>,
}

/// Ordered record of every candidate tried during one resolution.
///
/// Renders as `status@path` entries joined by `|`, with `ERR` standing in
/// for transport failures: `404@/applicants|200@/job/applicants`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptTrace(Vec<Attempt>);

impl AttemptTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: &str, status: Option<u16>) {
        self.0.push(Attempt { path: path.to_owned(), status });
    }

}

impl fmt::Display for AttemptTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attempt) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            match attempt.status {
                Some(status) => write!(f, "{}@{}", status, attempt.path)?,
                None => write!(f, "ERR@{}", attempt.path)?,
            }
        }
        Ok(())
    }
}
