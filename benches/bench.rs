use anyhow::{Context, anyhow};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use helium::{EXCEPTION, Exception, catch, declare_exception, raise, rethrow, try_catch};

declare_exception!(BENCH_ERROR = "BenchError": EXCEPTION);

fn bench_context(c: &mut Criterion) {
    fn rust() {
        fn imp(n: u32) {
            let n = black_box(n);
            if n == 0 {
                std::panic::resume_unwind(Box::new(anyhow!("Hello, world!")));
            } else {
                match std::panic::catch_unwind(|| imp(n - 1)) {
                    Ok(x) => x,
                    Err(bx) => {
                        let err = *bx.downcast::<anyhow::Error>().unwrap();
                        std::panic::resume_unwind(Box::new(err.context("In imp")));
                    }
                }
            }
        }
        let _ = black_box(std::panic::catch_unwind(|| {
            imp(5);
        }));
    }

    fn result() {
        fn imp(n: u32) -> anyhow::Result<()> {
            let n = black_box(n);
            if n == 0 {
                Err(anyhow!("Hello, world!"))
            } else {
                imp(n - 1).context("In imp")
            }
        }
        let _ = black_box(imp(5));
    }

    fn helium() {
        fn imp(n: u32) {
            let n = black_box(n);
            if n == 0 {
                raise(Exception::new(&BENCH_ERROR).with_message("Hello, world!"));
            }
            try_catch! {
                try { imp(n - 1) }
                catch (BENCH_ERROR, e) {
                    let message = format!("In imp: {}", e.message().unwrap_or_default());
                    raise(Exception::new(&BENCH_ERROR).with_message(message))
                }
            }
        }
        let _ = black_box(catch(|| imp(5)));
    }

    let mut group = c.benchmark_group("context");
    group.bench_function("Rust", |b| b.iter(|| rust()));
    group.bench_function("Result", |b| b.iter(|| result()));
    group.bench_function("Helium", |b| b.iter(|| helium()));
    group.finish();
}

fn bench_simple(c: &mut Criterion) {
    fn rust() {
        fn imp(n: u32) {
            let n = black_box(n);
            if n == 0 {
                std::panic::resume_unwind(Box::new("Hello, world!"));
            } else {
                match std::panic::catch_unwind(|| imp(n - 1)) {
                    Ok(x) => x,
                    Err(bx) => std::panic::resume_unwind(bx),
                }
            }
        }
        let _ = black_box(std::panic::catch_unwind(|| {
            imp(5);
        }));
    }

    fn helium() {
        fn imp(n: u32) {
            let n = black_box(n);
            if n == 0 {
                raise(Exception::new(&BENCH_ERROR).with_message("Hello, world!"));
            }
            try_catch! {
                try { imp(n - 1) }
                catch (BENCH_ERROR, _) { rethrow() }
            }
        }
        let _ = black_box(catch(|| imp(5)));
    }

    let mut group = c.benchmark_group("simple");
    group.bench_function("Rust", |b| b.iter(|| rust()));
    group.bench_function("Helium", |b| b.iter(|| helium()));
    group.finish();
}

fn bench_finally(c: &mut Criterion) {
    fn helium() -> u32 {
        let mut total = 0;
        for n in 0..black_box(100) {
            total += try_catch! {
                try { black_box(n) }
                finally { black_box(()) }
            };
        }
        total
    }

    let mut group = c.benchmark_group("finally");
    group.bench_function("Helium", |b| b.iter(|| helium()));
    group.finish();
}

criterion_group!(benches, bench_context, bench_simple, bench_finally);
criterion_main!(benches);
