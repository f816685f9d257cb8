use criterion::{criterion_group, criterion_main, Criterion};
use fsnail::{BufferConsole, SeededRandom, Vm, VmConfig, VmError};

fn vm(file_name: &str) -> Result<Vm<BufferConsole, SeededRandom>, VmError> {
    Vm::with_io(
        VmConfig::default_file_suppressed(file_name),
        BufferConsole::new(),
        SeededRandom::new(0),
    )
}

pub fn reset_vm_benchmark(c: &mut Criterion) {
    let mut vm = vm("resources/hello_world.fsn").unwrap();
    c.bench_function("reset vm", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.reset();

            Ok(())
        })
    });
}

pub fn hello_world_benchmark(c: &mut Criterion) {
    let mut vm = vm("resources/hello_world.fsn").unwrap();
    c.bench_function("hello world", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.run()?;
            vm.reset();

            Ok(())
        })
    });
}

pub fn count_benchmark(c: &mut Criterion) {
    let mut vm = vm("resources/count.fsn").unwrap();
    c.bench_function("count", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.run()?;
            vm.reset();

            Ok(())
        })
    });
}

pub fn fibonacci_benchmark(c: &mut Criterion) {
    let mut vm = vm("resources/fibonacci.fsn").unwrap();
    c.bench_function("fibonacci", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.run()?;
            vm.reset();

            Ok(())
        })
    });
}

pub fn load_program_benchmark(c: &mut Criterion) {
    c.bench_function("load and validate", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm("resources/fibonacci.fsn")?;

            Ok(())
        })
    });
}

criterion_group!(
    benches,
    reset_vm_benchmark,
    hello_world_benchmark,
    count_benchmark,
    fibonacci_benchmark,
    load_program_benchmark
);
criterion_main!(benches);
