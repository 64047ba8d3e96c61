use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mal_core::benchmark_support::{run_egress_dispatch_once, FanoutFixture, MatcherFixture};
use tokio::runtime::Builder;

const MATCHER_SUBSCRIPTIONS: usize = 256;
const MATCHER_UPDATES: usize = 64;
const FANOUT_CONSUMERS: usize = 128;
const FANOUT_UPDATES: usize = 32;
const EGRESS_MESSAGES: usize = 64;

fn broker_criterion(c: &mut Criterion) {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("benchmark runtime should build");

    let matcher_fixture = MatcherFixture::new(MATCHER_SUBSCRIPTIONS, MATCHER_UPDATES);

    let mut matcher_group = c.benchmark_group("matcher");
    matcher_group.bench_function("filters_and_domain_wildcards", |b| {
        b.iter(|| {
            let count = matcher_fixture.match_count();
            black_box(count);
        });
    });
    matcher_group.finish();

    let fanout_fixture = runtime
        .block_on(FanoutFixture::new(FANOUT_CONSUMERS, FANOUT_UPDATES))
        .expect("fan-out fixture should build");

    let mut fanout_group = c.benchmark_group("broker_fanout");
    fanout_group.bench_function("publish_snapshot_match", |b| {
        b.iter(|| {
            let notified = runtime
                .block_on(fanout_fixture.publish_once())
                .expect("publish should be accepted");
            black_box(notified);
        });
    });
    fanout_group.finish();

    let mut egress_group = c.benchmark_group("egress_forwarding");
    egress_group.bench_function("notify_dispatch", |b| {
        b.iter(|| {
            let send_count = runtime.block_on(run_egress_dispatch_once(EGRESS_MESSAGES));
            black_box(send_count);
        });
    });
    egress_group.finish();
}

criterion_group!(benches, broker_criterion);
criterion_main!(benches);
