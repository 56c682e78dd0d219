use injecta::{
    implements, Arguments, Container, Injectable, InstantiateErrorKind, KnownType, RegisterErrorKind, ServiceKey,
    TypeUniverse,
};
use tracing_test::traced_test;

macro_rules! unit_injectable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Injectable for $ty {
                fn construct(_: Arguments) -> Result<Self, InstantiateErrorKind> {
                    Ok(Self)
                }
            }
        )+
    };
}

mod storage {
    pub trait IRepository: Send + Sync {
        fn kind(&self) -> &'static str;
    }

    pub struct Repository;
    pub struct DefaultRepository;
    pub struct RepositoryFactory;

    impl IRepository for Repository {
        fn kind(&self) -> &'static str {
            "plain"
        }
    }

    impl IRepository for DefaultRepository {
        fn kind(&self) -> &'static str {
            "default"
        }
    }

    impl IRepository for RepositoryFactory {
        fn kind(&self) -> &'static str {
            "factory"
        }
    }

    pub mod sql {
        pub struct SqlRepository;

        impl super::IRepository for SqlRepository {
            fn kind(&self) -> &'static str {
                "sql"
            }
        }

        pub mod pooled {
            pub struct PooledRepository;

            impl super::super::IRepository for PooledRepository {
                fn kind(&self) -> &'static str {
                    "pooled"
                }
            }
        }
    }
}

mod other {
    pub struct ForeignRepository;

    impl crate::storage::IRepository for ForeignRepository {
        fn kind(&self) -> &'static str {
            "foreign"
        }
    }
}

use other::ForeignRepository;
use storage::{
    sql::{pooled::PooledRepository, SqlRepository},
    DefaultRepository, IRepository, Repository, RepositoryFactory,
};

unit_injectable!(
    Repository,
    DefaultRepository,
    RepositoryFactory,
    SqlRepository,
    PooledRepository,
    ForeignRepository,
);

implements!(Repository => dyn IRepository);
implements!(DefaultRepository => dyn IRepository);
implements!(RepositoryFactory => dyn IRepository);
implements!(SqlRepository => dyn IRepository);
implements!(PooledRepository => dyn IRepository);
implements!(ForeignRepository => dyn IRepository);

const OPERATIONS: &[&str] = &["kind"];

fn resolve_kind(universe: TypeUniverse) -> &'static str {
    let container = Container::new(universe);
    container.register_transient::<dyn IRepository>().unwrap();
    container.resolve::<dyn IRepository>().unwrap().kind()
}

#[test]
#[traced_test]
fn smaller_depth_difference_preferred() {
    let universe = || {
        TypeUniverse::new()
            .contract::<dyn IRepository>(OPERATIONS)
            .with(KnownType::builder::<PooledRepository>().implements::<dyn IRepository>())
            .with(KnownType::builder::<SqlRepository>().implements::<dyn IRepository>())
    };

    assert_eq!(resolve_kind(universe()), "sql");
    assert_eq!(
        universe().discover::<dyn IRepository>().unwrap(),
        ServiceKey::of::<SqlRepository>()
    );
}

#[test]
#[traced_test]
fn same_module_preferred() {
    let universe = TypeUniverse::new()
        .contract::<dyn IRepository>(OPERATIONS)
        .with(KnownType::builder::<ForeignRepository>().implements::<dyn IRepository>())
        .with(KnownType::builder::<RepositoryFactory>().implements::<dyn IRepository>());

    assert_eq!(resolve_kind(universe), "factory");
}

#[test]
#[traced_test]
fn preferred_name_breaks_ties() {
    let universe = TypeUniverse::new()
        .contract::<dyn IRepository>(OPERATIONS)
        .with(KnownType::builder::<DefaultRepository>().implements::<dyn IRepository>())
        .with(KnownType::builder::<Repository>().implements::<dyn IRepository>());

    assert_eq!(resolve_kind(universe), "plain");
}

#[test]
#[traced_test]
fn enumeration_order_breaks_full_ties() {
    let universe = || {
        TypeUniverse::new()
            .contract::<dyn IRepository>(OPERATIONS)
            .with(KnownType::builder::<RepositoryFactory>().implements::<dyn IRepository>())
            .with(KnownType::builder::<DefaultRepository>().implements::<dyn IRepository>())
    };

    for _ in 0..10 {
        assert_eq!(resolve_kind(universe()), "factory");
    }
}

#[test]
#[traced_test]
fn conforming_type_found_without_convention() {
    let universe = TypeUniverse::new()
        .contract::<dyn IRepository>(OPERATIONS)
        .with(
            KnownType::builder::<RepositoryFactory>()
                .conforms_to::<dyn IRepository>()
                .operations(OPERATIONS),
        );

    assert_eq!(resolve_kind(universe), "factory");
}

#[test]
#[traced_test]
fn exposing_types_shadow_conventions() {
    let universe = TypeUniverse::new()
        .contract::<dyn IRepository>(OPERATIONS)
        .with(KnownType::builder::<DefaultRepository>().conforms_to::<dyn IRepository>())
        .with(
            KnownType::builder::<SqlRepository>()
                .conforms_to::<dyn IRepository>()
                .operations(OPERATIONS),
        );

    assert_eq!(resolve_kind(universe), "sql");
}

#[test]
#[traced_test]
fn naming_convention_fallback() {
    let universe = TypeUniverse::new()
        .contract::<dyn IRepository>(OPERATIONS)
        .with(KnownType::builder::<RepositoryFactory>().conforms_to::<dyn IRepository>())
        .with(KnownType::builder::<DefaultRepository>().conforms_to::<dyn IRepository>())
        .with(
            KnownType::builder::<Repository>()
                .conforms_to::<dyn IRepository>()
                .operations(&["flush"]),
        );

    // `Repository` lacks an operation, `RepositoryFactory` doesn't follow the conventions
    assert_eq!(resolve_kind(universe), "default");
}

#[test]
#[traced_test]
fn declared_implementations_shadow_conventions() {
    let universe = TypeUniverse::new()
        .contract::<dyn IRepository>(OPERATIONS)
        .with(KnownType::builder::<Repository>().conforms_to::<dyn IRepository>())
        .with(KnownType::builder::<ForeignRepository>().implements::<dyn IRepository>());

    assert_eq!(resolve_kind(universe), "foreign");
}

#[test]
#[traced_test]
fn no_candidate_fails_registration() {
    let universe = TypeUniverse::new()
        .contract::<dyn IRepository>(OPERATIONS)
        .with(KnownType::builder::<RepositoryFactory>().conforms_to::<dyn IRepository>())
        .with(
            KnownType::builder::<Repository>()
                .conforms_to::<dyn IRepository>()
                .operations(&["flush"]),
        );
    let container = Container::new(universe);

    let Err(RegisterErrorKind::ImplementationNotFound { contract }) = container.register_singleton::<dyn IRepository>()
    else {
        panic!("registration should fail");
    };
    assert_eq!(contract, ServiceKey::of::<dyn IRepository>());
    assert!(!container.is_registered::<dyn IRepository>());
}
