use core::fmt::{self, Display, Formatter};
use core::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::io::Write;



/// Exit status of a process terminated by a [`Fault`].
pub const FAULT_EXIT_CODE : i32 = 1;

/// A correctness signal about the allocator under test.  Never recovered from: see [`Fault::terminate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)] pub enum Fault {
    /// The allocator returned no memory.
    Exhausted {
        thread:         usize,
        iteration:      usize,
        alloc:          usize,
        size:           usize,
        palette_index:  usize,
    },

    /// A verified byte didn't match the fingerprint its owner wrote.
    Corrupted {
        thread:         usize,
        iteration:      usize,
        alloc:          usize,
        offset:         usize,
        expected:       u8,
        actual:         u8,
    },
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Fault::Exhausted { thread, iteration, alloc, size, palette_index } =>
                write!(f, "Unable to allocate {size} bytes in thread {thread}, iter {iteration}, alloc {alloc}. {palette_index}"),
            Fault::Corrupted { thread, iteration, alloc, offset, expected, actual } =>
                write!(f, "Memory error in thread {thread}, iter {iteration}, alloc {alloc} @ {offset} : {actual:02X}!={expected:02X}"),
        }
    }
}

static TERMINATING : AtomicBool = AtomicBool::new(false);

impl Fault {
    /// Print this diagnostic and exit the process with [`FAULT_EXIT_CODE`].
    ///
    /// Only the first fault process-wide gets reported.
    /// Any worker faulting after that parks forever while the first one takes the process down.
    pub fn terminate(self) -> ! {
        if TERMINATING.swap(true, SeqCst) {
            loop { std::thread::park() }
        }
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{self}");
        let _ = stdout.flush();
        std::process::exit(FAULT_EXIT_CODE)
    }
}



#[test] fn display() {
    let exhausted = Fault::Exhausted { thread: 2, iteration: 3, alloc: 417, size: 99999, palette_index: 9 };
    assert_eq!(exhausted.to_string(), "Unable to allocate 99999 bytes in thread 2, iter 3, alloc 417. 9");

    let corrupted = Fault::Corrupted { thread: 1, iteration: 0, alloc: 12, offset: 1, expected: 0x02, actual: 0x01 };
    assert_eq!(corrupted.to_string(), "Memory error in thread 1, iter 0, alloc 12 @ 1 : 01!=02");

    let corrupted = Fault::Corrupted { thread: 0, iteration: 4, alloc: 0, offset: 300, expected: 0x2C, actual: 0xA5 };
    assert_eq!(corrupted.to_string(), "Memory error in thread 0, iter 4, alloc 0 @ 300 : A5!=2C");
}
