//! End-to-end runs of the `allocstress` binary, including deliberately faulty allocators.

use std::process::{Command, Output};



const EXE : &str = env!("CARGO_BIN_EXE_allocstress");

fn allocstress(conf: Option<&str>, extra: &[&str]) -> Output {
    let mut cmd = Command::new(EXE);
    cmd.env_remove("ALLOCSTRESS_CONF").env_remove("RUST_LOG");
    cmd.args(["--threads", "4", "--max-allocs", "300", "--iterations", "5", "--warmup-ms", "50"]);
    cmd.args(extra);
    if let Some(conf) = conf { cmd.arg(conf); }
    cmd.output().expect("unable to run allocstress")
}

fn stdout(o: &Output) -> String { String::from_utf8_lossy(&o.stdout).into_owned() }
fn stderr(o: &Output) -> String { String::from_utf8_lossy(&o.stderr).into_owned() }

fn count(haystack: &str, prefix: &str) -> usize { haystack.lines().filter(|l| l.starts_with(prefix)).count() }

#[track_caller] fn assert_completed(o: &Output) -> String {
    let out = stdout(o);
    assert_eq!(o.status.code(), Some(0), "stdout:\n{out}\nstderr:\n{}", stderr(o));
    assert!(out.starts_with("Starting 4 threads x 300 x 5 iterations...\n"), "{out}");
    assert_eq!(count(&out, "Done. Run time: "), 1, "{out}");
    assert!(out.contains("___ Begin allocstress statistics ___\n"), "{out}");
    assert!(out.contains("Allocations: nmalloc: "), "{out}");
    assert!(out.contains("___ End allocstress statistics ___\n"), "{out}");
    assert_eq!(count(&out, "Unable to allocate"), 0, "{out}");
    assert_eq!(count(&out, "Memory error"), 0, "{out}");
    out
}



#[cfg(feature = "c")] #[test] fn malloc_completes() {
    let out = assert_completed(&allocstress(None, &[]));
    assert!(out.contains("nfailed: 0, live: 0"), "{out}");
}

#[cfg(feature = "c")] #[test] fn empty_conf_matches_no_conf() {
    let none  = assert_completed(&allocstress(None, &[]));
    let empty = assert_completed(&allocstress(Some(""), &[]));
    let totals = |out: &str| out.lines().find(|l| l.starts_with("Allocations: ")).map(String::from);
    assert_eq!(totals(&none), totals(&empty));
}

#[cfg(feature = "c")] #[test] fn conf_from_env() {
    let o = Command::new(EXE)
        .env("ALLOCSTRESS_CONF", "fail_above:1024")
        .args(["--threads", "2", "--max-allocs", "300", "--warmup-ms", "10"])
        .output().expect("unable to run allocstress");
    assert_eq!(o.status.code(), Some(1));
    assert_eq!(count(&stdout(&o), "Unable to allocate"), 1);
}

#[cfg(feature = "c")] #[test] fn full_stats() {
    let out = assert_completed(&allocstress(None, &["--stats-opts", ""]));
    assert!(out.contains("\nbins:"), "{out}");
    assert!(out.contains("\nlarge:"), "{out}");
    assert!(out.contains("128 KiB"), "{out}");
}

#[cfg(feature = "c")] #[test] fn invalid_conf_is_reported_and_ignored() {
    let o = allocstress(Some("bogus:1,fail_above:lots"), &[]);
    assert_completed(&o);
    let err = stderr(&o);
    assert!(err.contains("<allocstress>: Invalid conf pair: bogus:1"), "{err}");
    assert!(err.contains("<allocstress>: Invalid conf value: fail_above:lots"), "{err}");
}

#[cfg(feature = "c")] #[test] fn exhaustion_is_fatal() {
    let o = allocstress(Some("fail_above:65536"), &[]);
    let out = stdout(&o);
    assert_eq!(o.status.code(), Some(1), "{out}");
    assert_eq!(count(&out, "Unable to allocate"), 1, "{out}");
    assert_eq!(count(&out, "Done. Run time: "), 0, "{out}");

    let line = out.lines().find(|l| l.starts_with("Unable to allocate")).unwrap();
    let size = line.split(' ').nth(3).unwrap().parse::<usize>().unwrap();
    assert!(size == 99999 || size == 131072, "{line}");
    assert!(line.contains(" in thread ") && line.contains(", iter 0, alloc "), "{line}");
}

#[cfg(feature = "c")] #[test] fn corruption_is_fatal() {
    let o = allocstress(Some("reuse_live:50"), &[]);
    let out = stdout(&o);
    assert_eq!(o.status.code(), Some(1), "{out}");
    assert_eq!(count(&out, "Memory error"), 1, "{out}");
    assert_eq!(count(&out, "Done. Run time: "), 0, "{out}");
    assert!(out.lines().any(|l| l.starts_with("Memory error in thread ") && l.contains(" @ 1 : ")), "{out}");
}

#[test] fn null_allocator_is_fatal() {
    let o = allocstress(None, &["--allocator", "null"]);
    let out = stdout(&o);
    assert_eq!(o.status.code(), Some(1), "{out}");
    assert_eq!(count(&out, "Unable to allocate"), 1, "{out}");
    assert!(out.lines().any(|l| l.starts_with("Unable to allocate") && l.contains(", iter 0, alloc 0. ")), "{out}");
}
