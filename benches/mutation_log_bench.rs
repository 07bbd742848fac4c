use std::hint::black_box;

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use glam::Vec3;

use tessera::tessera_scene::{DataValue, SlotTarget, codec};
use tessera::{RecordingScene, Scene, SceneId, SceneUpdate, SlotId, SlotType};

const NODE_COUNT: usize = 1_000;

/// One flush building a chain of `NODE_COUNT` transformed nodes, with a
/// data provider slot every tenth node.
fn build_update() -> SceneUpdate {
    let mut scene = RecordingScene::with_log_capacity(SceneId(1), NODE_COUNT * 4);
    let mut parent = None;
    for i in 0..NODE_COUNT {
        let node = scene.allocate_node().unwrap();
        let transform = scene.allocate_transform(node).unwrap();
        scene
            .set_translation(transform, Vec3::new(i as f32, 0.0, 0.0))
            .unwrap();
        if let Some(parent) = parent {
            scene.add_child(parent, node).unwrap();
        }
        if i % 10 == 0 {
            let data = scene.allocate_data_object(DataValue::Int(i as i32)).unwrap();
            scene
                .allocate_data_slot(
                    SlotId(i as u32),
                    SlotType::DataProvider,
                    SlotTarget::Data(data),
                )
                .unwrap();
        }
        parent = Some(node);
    }
    scene.flush()
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Elements(NODE_COUNT as u64));
    group.bench_function("node_chain_1000", |b| b.iter(|| black_box(build_update())));
    group.finish();
}

// ---------------------------------------------------------------------------
// Wire codec
// ---------------------------------------------------------------------------

fn bench_codec(c: &mut Criterion) {
    let update = build_update();
    let bytes = codec::encode_update(&update).unwrap();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("encode_update", |b| {
        b.iter(|| codec::encode_update(black_box(&update)).unwrap());
    });
    group.bench_function("decode_update", |b| {
        b.iter(|| codec::decode_update(black_box(&bytes)).unwrap());
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

fn bench_replay(c: &mut Criterion) {
    let update = build_update();

    let mut group = c.benchmark_group("replay");
    group.throughput(Throughput::Elements(update.log.len() as u64));
    group.bench_function("node_chain_1000", |b| {
        b.iter_batched(
            Scene::new,
            |mut scene| {
                update.log.replay(&mut scene).unwrap();
                scene
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_record, bench_codec, bench_replay);
criterion_main!(benches);
