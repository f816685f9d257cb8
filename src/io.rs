use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io::{self, stdin, stdout, BufRead, Write};

/// Escape sequence that homes the cursor and clears the terminal
pub const CLEAR_SCREEN: &str = "\x1b[1;1H\x1b[2J";

/// Text in and out of a running program
pub trait Console {
    fn write_str(&mut self, text: &str) -> io::Result<()>;

    /// Blocks until a full line is available. `Ok(None)` once the input is closed.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    fn clear_screen(&mut self) -> io::Result<()>;
}

/// Source for `randint`
pub trait RandomSource {
    /// A uniformly distributed integer in `[1, upper]`, `upper` is at least 1
    fn randint(&mut self, upper: i32) -> i32;
}

/// The process' standard input and output
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        let mut out = stdout();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        stdout().flush()?;
        let mut line = String::new();
        if stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line))
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.write_str(CLEAR_SCREEN)
    }
}

/// In-memory console: collects output and replays scripted input lines
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    output: String,
    input: VecDeque<String>,
}

impl BufferConsole {
    pub fn new() -> BufferConsole {
        BufferConsole::default()
    }

    pub fn with_input<I, S>(lines: I) -> BufferConsole
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        BufferConsole {
            output: String::new(),
            input: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl Console for BufferConsole {
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.write_str(CLEAR_SCREEN)
    }
}

/// Randomness from the thread local generator
#[derive(Debug, Default)]
pub struct ThreadRandom {
    rng: ThreadRng,
}

impl RandomSource for ThreadRandom {
    fn randint(&mut self, upper: i32) -> i32 {
        self.rng.gen_range(1..=upper)
    }
}

/// Reproducible randomness, used by tests and benchmarks
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> SeededRandom {
        SeededRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn randint(&mut self, upper: i32) -> i32 {
        self.rng.gen_range(1..=upper)
    }
}

#[cfg(test)]
mod tests {
    use super::{BufferConsole, Console, RandomSource, SeededRandom, ThreadRandom, CLEAR_SCREEN};

    #[test]
    fn buffer_console() -> std::io::Result<()> {
        let mut console = BufferConsole::with_input(["12\n", "x\n"]);
        console.write_str("a")?;
        console.clear_screen()?;
        assert_eq!(console.output(), format!("a{}", CLEAR_SCREEN));
        assert_eq!(console.read_line()?, Some("12\n".to_string()));
        assert_eq!(console.read_line()?, Some("x\n".to_string()));
        assert_eq!(console.read_line()?, None);
        assert_eq!(console.take_output().len(), 1 + CLEAR_SCREEN.len());
        assert!(console.output().is_empty());

        Ok(())
    }

    #[test]
    fn randint_stays_in_range() {
        let mut seeded = SeededRandom::new(7);
        let mut thread = ThreadRandom::default();
        for _ in 0..500 {
            let value = seeded.randint(6);
            assert!((1..=6).contains(&value));
            let value = thread.randint(3);
            assert!((1..=3).contains(&value));
        }
        assert_eq!(seeded.randint(1), 1);
    }

    #[test]
    fn seeded_is_reproducible() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        let a: Vec<i32> = (0..20).map(|_| a.randint(100)).collect();
        let b: Vec<i32> = (0..20).map(|_| b.randint(100)).collect();
        assert_eq!(a, b);
    }
}
