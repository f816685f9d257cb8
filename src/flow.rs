use crate::program::{Opcode, Program};

impl Program {
    /// Index of the `endif` closing the conditional opened at `opener`.
    ///
    /// Nested conditionals are skipped whole: every opener met on the way raises the nesting
    /// level, every other `endif` lowers it, and only an `endif` met at the level of `opener`
    /// itself matches.
    pub fn matching_endif(&self, opener: usize) -> Option<usize> {
        let mut level = 0;
        for (i, op) in self.ops().iter().enumerate().skip(opener) {
            if op.closes_block() {
                if level == 1 {
                    return Some(i);
                }
                level -= 1;
            }
            if op.opens_block() {
                level += 1;
            }
        }

        None
    }

    /// Index of the name token of the first `label <name>` declaration. Execution resumes right
    /// after it.
    pub fn resolve_label(&self, name: &str) -> Option<usize> {
        self.labels().get(name).copied()
    }

    /// Same as `resolve_label`, walking the tokens instead of using the prebuilt table
    pub fn scan_label(&self, name: &str) -> Option<usize> {
        let ops = self.ops();
        (0..self.source_len().saturating_sub(1)).find_map(|i| {
            let declares = ops[i] == Opcode::Label
                && self.token(i + 1).map_or(false, |token| token.text == name);
            if declares {
                Some(i + 1)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::Lexer;
    use crate::program::Program;

    fn program(source: &str) -> Program {
        Program::new(Lexer::from_text(source).produce_tokens())
    }

    #[test]
    fn skip_simple_block() {
        let program = program("ifeq pop endif dup");
        assert_eq!(program.matching_endif(0), Some(2));
    }

    #[test]
    fn skip_nested_blocks() {
        //                     0    1    2   3     4     5   6     7
        let program = program("ifgr pop ifeq dup endif pop endif sum");
        assert_eq!(program.matching_endif(0), Some(6));
        assert_eq!(program.matching_endif(2), Some(4));
    }

    #[test]
    fn skip_sibling_blocks() {
        //                     0    1    2    3      4     5
        let program = program("ifgr ifeq endif iflw endif endif");
        assert_eq!(program.matching_endif(0), Some(5));
        assert_eq!(program.matching_endif(3), Some(4));
    }

    #[test]
    fn skip_without_endif() {
        let program = program("endif ifeq pop");
        assert_eq!(program.matching_endif(1), None);
    }

    #[test]
    fn labels_resolve_forward_and_backward() {
        //                     0     1   2   3    4    5     6
        let program = program("label top pop goto end label end");
        assert_eq!(program.resolve_label("top"), Some(1));
        assert_eq!(program.resolve_label("end"), Some(6));
        assert_eq!(program.resolve_label("missing"), None);
    }

    #[test]
    fn table_agrees_with_scan() {
        let program = program("goto b label a pop label b label a dup label");
        for name in ["a", "b", "c", "label", "dup"] {
            assert_eq!(program.resolve_label(name), program.scan_label(name), "{}", name);
        }
        assert_eq!(program.resolve_label("a"), Some(3));
    }

    #[test]
    fn goto_argument_is_not_a_declaration() {
        let program = program("goto x pop");
        assert_eq!(program.resolve_label("x"), None);
    }
}
