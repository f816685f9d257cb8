use crate::program::Program;
use std::fmt::Display;

/// Outcome of checking that conditional blocks are balanced
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct BlockReport {
    /// Lines of openers that never see an `endif`, ascending
    pub unmatched_openers: Vec<usize>,
    /// Lines of `endif`s without an opener, ascending
    pub unmatched_endifs: Vec<usize>,
    failed: bool,
}

impl BlockReport {
    /// A failed report for a single opener found unmatched while running
    pub fn unmatched_opener(line: usize) -> BlockReport {
        BlockReport {
            unmatched_openers: vec![line],
            unmatched_endifs: vec![],
            failed: true,
        }
    }

    pub fn is_ok(&self) -> bool {
        !self.failed
    }

    /// Line of the first reported mismatch
    pub fn first_line(&self) -> Option<usize> {
        self.unmatched_openers
            .first()
            .into_iter()
            .chain(self.unmatched_endifs.first())
            .min()
            .copied()
    }
}

impl Display for BlockReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut messages = vec![];
        for line in &self.unmatched_openers {
            messages.push(format!("the if at line {} is missing its counter part", line));
        }
        for line in &self.unmatched_endifs {
            messages.push(format!("the endif at line {} is missing its counter part", line));
        }
        if messages.is_empty() {
            messages.push("the conditional blocks are not balanced".to_string());
        }
        write!(f, "{}", messages.join("; "))
    }
}

/// Nesting counter that remembers the lines of still open blocks. The depth may go negative,
/// lines are only recorded while it is not.
#[derive(Debug, Default)]
struct Pending {
    depth: isize,
    lines: Vec<usize>,
}

impl Pending {
    fn open(&mut self, line: usize) {
        if self.depth >= 0 {
            self.lines.push(line);
        }
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth -= 1;
        if self.depth >= 0 {
            self.lines.truncate(self.depth as usize);
        }
    }
}

/// Checks that every conditional opener has an `endif` and vice versa.
///
/// A forward scan finds openers left open, a backward scan finds `endif`s left open. The check
/// only fails when one of the two counters ends below zero, so a block written as `endif ifeq`
/// passes.
pub fn validate(program: &Program) -> BlockReport {
    let mut forward = Pending::default();
    for (token, op) in program.tokens().iter().zip(program.ops()) {
        if op.opens_block() {
            forward.open(token.line);
        } else if op.closes_block() {
            forward.close();
        }
    }

    let mut backward = Pending::default();
    for (token, op) in program.tokens().iter().zip(program.ops()).rev() {
        if op.closes_block() {
            backward.open(token.line);
        } else if op.opens_block() {
            backward.close();
        }
    }
    backward.lines.reverse();

    BlockReport {
        failed: forward.depth < 0 || backward.depth < 0,
        unmatched_openers: forward.lines,
        unmatched_endifs: backward.lines,
    }
}

#[cfg(test)]
mod tests {
    use super::{validate, BlockReport};
    use crate::lexer::Lexer;
    use crate::program::Program;

    fn report(source: &str) -> BlockReport {
        validate(&Program::new(Lexer::from_text(source).produce_tokens()))
    }

    #[test]
    fn balanced() {
        let report = report("ifeq\n ifgr\n endif\nendif\niftrue endif");
        assert!(report.is_ok());
        assert_eq!(report, BlockReport::default());
    }

    #[test]
    fn no_conditionals() {
        assert!(report("push 1 pop").is_ok());
    }

    #[test]
    fn missing_endif() {
        let report = report("push 1\npush 2\nifeq\npop");
        assert!(!report.is_ok());
        assert_eq!(report.unmatched_openers, vec![3]);
        assert!(report.unmatched_endifs.is_empty());
        assert_eq!(report.first_line(), Some(3));
    }

    #[test]
    fn missing_inner_endif_reports_outer_opener() {
        let report = report("ifeq\nifgr\nendif");
        assert!(!report.is_ok());
        assert_eq!(report.unmatched_openers, vec![1]);
    }

    #[test]
    fn stray_endif() {
        let report = report("pop\nendif");
        assert!(!report.is_ok());
        assert_eq!(report.unmatched_endifs, vec![2]);
        assert!(report.unmatched_openers.is_empty());
    }

    #[test]
    fn extra_endif_after_block() {
        let report = report("ifeq\nendif\nendif");
        assert!(!report.is_ok());
        assert_eq!(report.unmatched_endifs, vec![3]);
    }

    #[test]
    fn several_endifs_in_ascending_order() {
        let report = report("endif\nendif\nendif");
        assert_eq!(report.unmatched_endifs, vec![1, 2, 3]);
    }

    #[test]
    fn reversed_block_passes() {
        assert!(report("endif\nifeq").is_ok());
    }

    #[test]
    fn commented_conditionals_are_ignored() {
        assert!(report("--> ifeq <-- pop").is_ok());
    }

    #[test]
    fn message() {
        let report = report("ifeq");
        assert_eq!(
            report.to_string(),
            "the if at line 1 is missing its counter part"
        );
    }
}
