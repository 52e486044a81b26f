// ═══════════════════════════════════════════════════════════════════════
// Schema cache, build, and path accessor behavior
// ═══════════════════════════════════════════════════════════════════════
mod schema_tests {
    use crate::error::SchemaError;
    use crate::model;
    use crate::naming::{NamingPolicy, SnakeCaseNaming};
    use crate::path;
    use crate::reflect::{FieldKind, Opaque};
    use crate::schema::SchemaCache;
    use crate::value::Value;
    use parking_lot::Mutex;
    use smol_str::SmolStr;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;
    use std::sync::Barrier;

    // ─── Fixtures ───────────────────────────────────────────────────────

    model! {
        pub struct Address {
            field city: String,
            field zip: String => "zip_code",
            field lines: Vec<String>,
        }
    }

    model! {
        pub struct User as "users" {
            field name: String,
            field age: u32,
            field addr: Address,
            field tags: Vec<String>,
            field scores: HashMap<String, i64>,
            field by_id: BTreeMap<i64, String>,
            field nickname: Option<String>,
        }
    }

    fn make_user() -> User {
        let mut user = User {
            name: "Alice".into(),
            age: 28,
            ..User::default()
        };
        user.addr.city = "Berlin".into();
        user.addr.zip = "10115".into();
        user.tags = vec!["a".into(), "b".into(), "c".into()];
        user.scores.insert("math".into(), 91);
        user.by_id.insert(42, "answer".into());
        user
    }

    /// Naming policy that counts how often each type name is scanned.
    /// `table_name` runs once per build, so the count is the build count.
    #[derive(Default)]
    struct CountingNaming {
        tables: Mutex<HashMap<String, usize>>,
    }

    impl CountingNaming {
        fn builds(&self, type_name: &str) -> usize {
            self.tables.lock().get(type_name).copied().unwrap_or(0)
        }
    }

    impl NamingPolicy for CountingNaming {
        fn table_name(&self, type_name: &str) -> SmolStr {
            *self.tables.lock().entry(type_name.to_string()).or_insert(0) += 1;
            SnakeCaseNaming.table_name(type_name)
        }

        fn column_name(&self, table: &str, field_name: &str) -> SmolStr {
            SnakeCaseNaming.column_name(table, field_name)
        }
    }

    // ─── Build: names, tables, tags ─────────────────────────────────────

    #[test]
    fn test_schema_identity_and_table() {
        let cache = SchemaCache::new();
        let user = cache.resolve::<User>(None).unwrap();
        assert_eq!(user.name, "User");
        assert_eq!(user.table, "users");
        assert_eq!(format!("{}", user), "User(users)");

        let addr = cache.resolve::<Address>(None).unwrap();
        assert_eq!(addr.table, "address");
    }

    #[test]
    fn test_column_tag_and_policy() {
        let cache = SchemaCache::new();
        let addr = cache.resolve::<Address>(None).unwrap();
        assert_eq!(addr.field_db_name("zip"), Some("zip_code"));
        assert_eq!(addr.field_db_name("city"), Some("city"));
    }

    #[test]
    fn test_inline_tag_defers_to_policy() {
        model! {
            pub struct Inlined {
                field note: String => "inline",
            }
        }
        let cache = SchemaCache::new();
        let schema = cache.resolve::<Inlined>(None).unwrap();
        assert_eq!(schema.field_db_name("note"), Some("note"));
    }

    #[test]
    fn test_field_kinds_and_nested_schema() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();

        let addr = schema.field_by_name("addr").unwrap();
        assert_eq!(addr.kind, FieldKind::Record);
        assert!(addr.embedded_schema.is_some());

        // container elements are introspected lazily, no schema up front
        let tags = schema.field_by_name("tags").unwrap();
        assert_eq!(tags.kind, FieldKind::Sequence);
        assert!(tags.embedded_schema.is_none());
        let scores = schema.field_by_name("scores").unwrap();
        assert_eq!(scores.kind, FieldKind::Mapping);
        assert!(scores.embedded_schema.is_none());
    }

    #[test]
    fn test_look_up_field_prefers_storage_name() {
        model! {
            pub struct Tricky {
                field a: String => "b",
                field b: String => "c",
            }
        }
        let cache = SchemaCache::new();
        let schema = cache.resolve::<Tricky>(None).unwrap();
        // "b" is both field a's storage name and field b's declared name
        assert_eq!(schema.look_up_field("b").unwrap().name, "a");
        assert_eq!(schema.look_up_field("c").unwrap().name, "b");
    }

    #[test]
    fn test_alternate_table_name_is_a_distinct_entry() {
        let cache = SchemaCache::new();
        let default = cache.resolve::<User>(None).unwrap();
        let archive = cache.resolve::<User>(Some("archive")).unwrap();
        assert!(!Arc::ptr_eq(&default, &archive));
        assert_eq!(archive.table, "archive");
        assert_eq!(default.table, "users");

        // both entries stay cached independently
        let again = cache.resolve::<User>(Some("archive")).unwrap();
        assert!(Arc::ptr_eq(&archive, &again));
    }

    // ─── Build: embedding and flattening ────────────────────────────────

    model! {
        pub struct Meta {
            field created: i64,
            field x: String => "meta_x",
        }
    }

    model! {
        pub struct Audit {
            field x: String => "audit_x",
            field touched: bool,
        }
    }

    model! {
        pub struct Doc {
            field id: String,
            embed meta: Meta,
            embed audit: Audit,
        }
    }

    #[test]
    fn test_embedded_fields_are_promoted() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<Doc>(None).unwrap();

        // declared fields exclude the anonymous ones
        let declared: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(declared, ["id"]);
        assert_eq!(schema.embedded.len(), 2);

        for name in ["id", "created", "x", "touched"] {
            assert!(schema.field_by_name(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_first_declared_embed_wins_on_name_collision() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<Doc>(None).unwrap();

        // both Meta and Audit declare "x"; Meta comes first
        let x = schema.field_by_name("x").unwrap();
        assert_eq!(x.db_name, "meta_x");
        assert_eq!(x.index, [1, 1]);

        let mut doc = Doc::default();
        doc.meta.x = "from meta".into();
        doc.audit.x = "from audit".into();
        let got = schema.get(&doc, &path!["x"]).unwrap();
        assert_eq!(got, Some(Value::from("from meta")));
    }

    #[test]
    fn test_promoted_field_set_reaches_the_embed() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<Doc>(None).unwrap();

        let mut doc = Doc::default();
        schema.set(&mut doc, 5i64.into(), &path!["created"]).unwrap();
        assert_eq!(doc.meta.created, 5);

        schema.set(&mut doc, true.into(), &path!["touched"]).unwrap();
        assert!(doc.audit.touched);
    }

    #[test]
    fn test_duplicate_storage_name_fails_the_build() {
        model! {
            pub struct Clash {
                field a: String => "same",
                field b: String => "same",
            }
        }
        let cache = SchemaCache::new();
        let err = cache.resolve::<Clash>(None).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::DuplicateStorageName { ref schema, ref db_name, .. }
                if schema == "Clash" && db_name == "same"
        ));
    }

    #[test]
    fn test_failed_build_is_evicted_and_retried() {
        model! {
            pub struct Broken {
                field a: i64 => "dup",
                field b: i64 => "dup",
            }
        }
        let naming = Arc::new(CountingNaming::default());
        let cache = SchemaCache::with_naming(naming.clone());

        assert!(cache.resolve::<Broken>(None).is_err());
        assert!(cache.resolve::<Broken>(None).is_err());
        // the failed entry was evicted each time, so the scan ran twice
        assert_eq!(naming.builds("Broken"), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_opaque_field_is_rejected() {
        model! {
            pub struct WithChan {
                field name: String,
                field events: Opaque<std::sync::mpsc::Sender<i64>>,
            }
        }
        let cache = SchemaCache::new();
        let err = cache.resolve::<WithChan>(None).unwrap_err();
        match err {
            SchemaError::InvalidEmbeddedField {
                schema,
                field,
                type_name,
            } => {
                assert_eq!(schema, "WithChan");
                assert_eq!(field, "events");
                assert!(type_name.contains("Sender"));
            }
            other => panic!("expected InvalidEmbeddedField, got {other:?}"),
        }
    }

    #[test]
    fn test_recursive_model_is_rejected_not_deadlocked() {
        model! {
            pub struct Node {
                field label: String,
                field next: Option<Box<Node>>,
            }
        }
        let cache = SchemaCache::new();
        let err = cache.resolve::<Node>(None).unwrap_err();
        assert!(matches!(err, SchemaError::RecursiveModel { model } if model == "Node"));
    }

    // ─── Cache: singleflight ────────────────────────────────────────────

    #[test]
    fn test_concurrent_resolve_builds_once() {
        model! {
            pub struct Shared {
                field label: String,
                field addr: Address,
            }
        }

        const THREADS: usize = 8;
        let naming = Arc::new(CountingNaming::default());
        let cache = SchemaCache::with_naming(naming.clone());
        let barrier = Barrier::new(THREADS);

        let schemas = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache.resolve::<Shared>(None).unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        for schema in &schemas[1..] {
            assert!(Arc::ptr_eq(&schemas[0], schema));
        }
        // one scan for Shared, one re-entrant scan for the nested Address
        assert_eq!(naming.builds("Shared"), 1);
        assert_eq!(naming.builds("Address"), 1);
    }

    #[test]
    fn test_resolve_value_strips_layers() {
        let cache = SchemaCache::new();
        let direct = cache.resolve::<User>(None).unwrap();

        let user = User::default();
        assert!(Arc::ptr_eq(
            &direct,
            &cache.resolve_value(&user, None).unwrap()
        ));

        let seq: Vec<User> = Vec::new();
        assert!(Arc::ptr_eq(&direct, &cache.resolve_value(&seq, None).unwrap()));

        let opt: Option<User> = None;
        assert!(Arc::ptr_eq(&direct, &cache.resolve_value(&opt, None).unwrap()));

        let err = cache.resolve_value(&42i64, None).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedDataType { .. }));
    }

    // ─── Read path ──────────────────────────────────────────────────────

    #[test]
    fn test_get_nested_record_field() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let user = make_user();

        let got = schema.get(&user, &path!["addr", "city"]).unwrap();
        assert_eq!(got, Some(Value::from("Berlin")));

        // storage names resolve too
        let got = schema.get(&user, &path!["addr", "zip_code"]).unwrap();
        assert_eq!(got, Some(Value::from("10115")));
    }

    #[test]
    fn test_get_with_empty_path_returns_whole_value() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let user = make_user();

        let whole = schema.get(&user, &[]).unwrap().unwrap();
        assert_eq!(whole.get("name"), Some(&Value::from("Alice")));
        let addr = whole.get("addr").unwrap();
        assert_eq!(addr.get("city"), Some(&Value::from("Berlin")));
    }

    #[test]
    fn test_get_sequence_by_index() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let user = make_user();

        assert_eq!(
            schema.get(&user, &path!["tags", 1]).unwrap(),
            Some(Value::from("b"))
        );
        // numeric strings convert to indexes
        assert_eq!(
            schema.get(&user, &path!["tags", "2"]).unwrap(),
            Some(Value::from("c"))
        );
    }

    #[test]
    fn test_get_misses_are_soft() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let user = make_user();

        // out-of-range index on a 3-element sequence
        assert_eq!(schema.get(&user, &path!["tags", 99]).unwrap(), None);
        // unknown field name
        assert_eq!(schema.get(&user, &path!["no_such_field"]).unwrap(), None);
        // absent map key
        assert_eq!(schema.get(&user, &path!["scores", "art"]).unwrap(), None);
        // non-numeric sequence index
        assert_eq!(schema.get(&user, &path!["tags", "first"]).unwrap(), None);
        // unset option
        assert_eq!(schema.get(&user, &path!["nickname"]).unwrap(), None);
    }

    #[test]
    fn test_get_map_keys_are_type_aware() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let user = make_user();

        assert_eq!(
            schema.get(&user, &path!["scores", "math"]).unwrap(),
            Some(Value::from(91i64))
        );
        assert_eq!(
            schema.get(&user, &path!["by_id", 42]).unwrap(),
            Some(Value::from("answer"))
        );
        // numeric string converts to the declared integer key type
        assert_eq!(
            schema.get(&user, &path!["by_id", "42"]).unwrap(),
            Some(Value::from("answer"))
        );

        let err = schema.get(&user, &path!["by_id", "answer"]).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::KeyTypeMismatch { expected: "i64", .. }
        ));
    }

    #[test]
    fn test_get_cannot_descend_past_a_scalar() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let user = make_user();

        let err = schema.get(&user, &path!["age", "x"]).unwrap_err();
        assert!(matches!(err, SchemaError::CannotDescend { .. }));
    }

    // ─── Write path ─────────────────────────────────────────────────────

    #[test]
    fn test_set_then_get_round_trip() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let mut user = make_user();

        schema
            .set(&mut user, "Paris".into(), &path!["addr", "city"])
            .unwrap();
        assert_eq!(user.addr.city, "Paris");
        assert_eq!(
            schema.get(&user, &path!["addr", "city"]).unwrap(),
            Some(Value::from("Paris"))
        );
    }

    #[test]
    fn test_set_coerces_scalar_values() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let mut user = make_user();

        // string → integer
        schema.set(&mut user, "33".into(), &path!["age"]).unwrap();
        assert_eq!(user.age, 33);
        // integer → string
        schema.set(&mut user, 7i64.into(), &path!["name"]).unwrap();
        assert_eq!(user.name, "7");

        let err = schema
            .set(&mut user, "not a number".into(), &path!["age"])
            .unwrap_err();
        assert!(matches!(err, SchemaError::CannotAssign { .. }));
    }

    #[test]
    fn test_set_whole_containers() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let mut user = make_user();

        let tags = Value::from(serde_json::json!(["x", "y"]));
        schema.set(&mut user, tags, &path!["tags"]).unwrap();
        assert_eq!(user.tags, ["x", "y"]);

        let scores = Value::from(serde_json::json!({"art": 77}));
        schema.set(&mut user, scores, &path!["scores"]).unwrap();
        assert_eq!(user.scores.get("art"), Some(&77));
    }

    #[test]
    fn test_set_option_fields() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let mut user = make_user();

        schema
            .set(&mut user, "Al".into(), &path!["nickname"])
            .unwrap();
        assert_eq!(user.nickname.as_deref(), Some("Al"));

        schema
            .set(&mut user, Value::Null, &path!["nickname"])
            .unwrap();
        assert_eq!(user.nickname, None);
    }

    #[test]
    fn test_set_through_unset_option_initializes() {
        model! {
            pub struct Profile {
                field addr: Option<Address>,
            }
        }
        let cache = SchemaCache::new();
        let schema = cache.resolve::<Profile>(None).unwrap();
        let mut profile = Profile::default();

        // reads through the unset option miss softly
        assert_eq!(schema.get(&profile, &path!["addr", "city"]).unwrap(), None);

        schema
            .set(&mut profile, "Lyon".into(), &path!["addr", "city"])
            .unwrap();
        assert_eq!(profile.addr.as_ref().unwrap().city, "Lyon");
        assert_eq!(
            schema.get(&profile, &path!["addr", "city"]).unwrap(),
            Some(Value::from("Lyon"))
        );
    }

    #[test]
    fn test_set_misses_are_errors() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let mut user = make_user();

        let err = schema
            .set(&mut user, "x".into(), &path!["no_such", "city"])
            .unwrap_err();
        assert!(matches!(err, SchemaError::FieldNotFound { .. }));

        // a scalar field cannot be an intermediate segment
        let err = schema
            .set(&mut user, "x".into(), &path!["name", "city"])
            .unwrap_err();
        assert!(matches!(err, SchemaError::FieldNotObject { .. }));

        // neither can a mapping
        let err = schema
            .set(&mut user, 1i64.into(), &path!["scores", "math"])
            .unwrap_err();
        assert!(matches!(err, SchemaError::FieldNotObject { .. }));

        let err = schema.set(&mut user, 1i64.into(), &[]).unwrap_err();
        assert!(matches!(err, SchemaError::PathEmpty));
    }

    // ─── Direct field access ────────────────────────────────────────────

    #[test]
    fn test_single_key_get_set() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();
        let mut user = make_user();

        assert_eq!(schema.get_field(&user, "name"), Some(Value::from("Alice")));
        assert_eq!(schema.get_field(&user, "nope"), None);

        schema.set_field(&mut user, "age", 40i64.into()).unwrap();
        assert_eq!(user.age, 40);

        let err = schema
            .set_field(&mut user, "nope", 1i64.into())
            .unwrap_err();
        assert!(matches!(err, SchemaError::FieldNotFound { .. }));
    }

    #[test]
    fn test_new_record_is_usable() {
        let cache = SchemaCache::new();
        let schema = cache.resolve::<User>(None).unwrap();

        let mut record = schema.new_record();
        schema
            .set(record.as_mut(), "Bob".into(), &path!["name"])
            .unwrap();
        assert_eq!(
            schema.get(record.as_ref(), &path!["name"]).unwrap(),
            Some(Value::from("Bob"))
        );
    }
}
