use cotask::{OverflowPolicy, Priority, Queue, Scheduler, Step, SysTimer, Task};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const DISPATCHES_PER_ITER: u64 = 10_000;

fn noop() -> Step {
    Step::Yield
}

/// Dispatch cost as the task table grows (the scan is O(n) per call).
fn bench_dispatch_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(DISPATCHES_PER_ITER));

    const NAMES: [&str; 16] = [
        "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9", "t10", "t11", "t12", "t13",
        "t14", "t15",
    ];

    for tasks in [2usize, 4, 8, 16] {
        group.bench_with_input(BenchmarkId::new("tasks", tasks), &tasks, |b, &tasks| {
            let timer = SysTimer::software();
            let mut bodies = [noop as fn() -> Step; 16];
            let mut sched: Scheduler<_> = Scheduler::new(&timer);
            for (i, body) in bodies.iter_mut().take(tasks).enumerate() {
                let period = 1 + i as u64;
                sched
                    .register(Task::periodic(NAMES[i], body, Priority(i as u8), period).unwrap())
                    .unwrap();
            }
            let mut now = 0u64;
            b.iter(|| {
                for _ in 0..DISPATCHES_PER_ITER {
                    black_box(sched.dispatch_once(now).unwrap());
                    now += 1;
                }
            })
        });
    }

    group.finish();
}

fn bench_queue_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(DISPATCHES_PER_ITER));

    group.bench_function("put_get_overwrite_cap16", |b| {
        let q = Queue::<u32, 16>::new("bench", OverflowPolicy::Overwrite);
        b.iter(|| {
            for i in 0..DISPATCHES_PER_ITER as u32 {
                q.put(black_box(i)).unwrap();
                if i % 4 == 0 {
                    black_box(q.get().ok());
                }
            }
            q.clear();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_dispatch_scan, bench_queue_cycle);
criterion_main!(benches);
