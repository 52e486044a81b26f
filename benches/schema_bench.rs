use criterion::{Criterion, criterion_group, criterion_main};
use modelmap::{SchemaCache, Value, model, path};
use std::hint::black_box;

// ─── Test Data ──────────────────────────────────────────────────────────────

model! {
    pub struct Privacy {
        field public: bool,
        field level: i64,
    }
}

model! {
    pub struct Settings {
        field theme: String,
        field notifications: bool,
        field privacy: Privacy,
    }
}

model! {
    pub struct Profile {
        field bio: String,
        field avatar: String,
        field settings: Settings,
    }
}

model! {
    pub struct User as "users" {
        field id: String,
        field name: String,
        field age: u32,
        field score: f64,
        field active: bool,
        field tags: Vec<String>,
        field profile: Profile,
    }
}

fn make_user() -> User {
    let mut user = User {
        id: "user:abc123".into(),
        name: "Alice".into(),
        age: 28,
        score: 99.5,
        active: true,
        ..User::default()
    };
    user.tags = vec!["developer".into(), "rust".into(), "database".into()];
    user.profile.bio = "Software engineer".into();
    user.profile.avatar = "https://example.com/avatar.jpg".into();
    user.profile.settings.theme = "dark".into();
    user.profile.settings.notifications = true;
    user.profile.settings.privacy.level = 3;
    user
}

// ─── Benchmarks ─────────────────────────────────────────────────────────────

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    group.bench_function("cold", |b| {
        b.iter(|| {
            let cache = SchemaCache::new();
            black_box(cache.resolve::<User>(None).unwrap())
        })
    });

    let cache = SchemaCache::new();
    cache.resolve::<User>(None).unwrap();
    group.bench_function("cached", |b| {
        b.iter(|| black_box(cache.resolve::<User>(None).unwrap()))
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    let cache = SchemaCache::new();
    let schema = cache.resolve::<User>(None).unwrap();
    let user = make_user();

    group.bench_function("shallow", |b| {
        b.iter(|| black_box(schema.get(&user, &path!["name"]).unwrap()))
    });

    group.bench_function("deep", |b| {
        b.iter(|| {
            black_box(
                schema
                    .get(&user, &path!["profile", "settings", "privacy", "level"])
                    .unwrap(),
            )
        })
    });

    group.bench_function("sequence_index", |b| {
        b.iter(|| black_box(schema.get(&user, &path!["tags", 1]).unwrap()))
    });

    group.finish();
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");
    let cache = SchemaCache::new();
    let schema = cache.resolve::<User>(None).unwrap();
    let mut user = make_user();

    group.bench_function("shallow", |b| {
        b.iter(|| {
            schema
                .set(&mut user, Value::from(30i64), &path!["age"])
                .unwrap()
        })
    });

    group.bench_function("deep", |b| {
        b.iter(|| {
            schema
                .set(
                    &mut user,
                    Value::from("light"),
                    &path!["profile", "settings", "theme"],
                )
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_get, bench_set);
criterion_main!(benches);
