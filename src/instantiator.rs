use alloc::{boxed::Box, sync::Arc, vec, vec::Vec};
use tracing::debug;

use crate::{
    any::{Instance, ServiceKey},
    dependency::{Arguments, Parameter},
    dependency_resolver::Resolver,
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    finalizer::Disposer,
    inject::Implements,
};

/// Freshly built instance with the disposal hooks bound to it
pub(crate) struct Built {
    pub(crate) instance: Instance,
    pub(crate) disposers: Vec<Disposer>,
}

impl Built {
    #[inline]
    #[must_use]
    pub(crate) const fn new(instance: Instance) -> Self {
        Self {
            instance,
            disposers: Vec::new(),
        }
    }
}

/// Type-erased constructor of implementation `I` viewed as service `S`
#[derive(Clone, Copy)]
pub(crate) struct Constructor {
    pub(crate) implementation: ServiceKey,
    parameters: fn() -> Vec<Parameter>,
    construct: fn(Arguments) -> Result<Built, InstantiateErrorKind>,
}

impl Constructor {
    #[inline]
    #[must_use]
    pub(crate) fn of<S, I>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        I: Implements<S>,
    {
        Self {
            implementation: ServiceKey::of::<I>(),
            parameters: I::parameters,
            construct: construct::<S, I>,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn parameters(&self) -> Vec<Parameter> {
        (self.parameters)()
    }

    /// Resolves the parameters through `resolver` and calls the constructor.
    ///
    /// A parameter whose service isn't registered falls back to its default,
    /// without a default the error names the parameter and the expected key.
    pub(crate) fn instantiate(
        &self,
        service: ServiceKey,
        resolver: &Resolver<'_>,
    ) -> Result<Built, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>> {
        let mut arguments = Arguments::new();
        for Parameter { name, key, default } in self.parameters() {
            let Some(key) = key else {
                continue;
            };
            match resolver.resolve_key(key) {
                Ok(value) => arguments.insert(name, value),
                Err(ResolveErrorKind::UnregisteredService { .. }) => match default {
                    Some(value) => {
                        debug!(parameter = name, "Default used");
                        arguments.insert(name, value);
                    }
                    None => {
                        return Err(InstantiatorErrorKind::Deps(ResolveErrorKind::DependencyNotFound {
                            service,
                            parameter: name,
                            expected: key,
                        }))
                    }
                },
                Err(err) => return Err(InstantiatorErrorKind::Deps(err)),
            }
        }

        let built = (self.construct)(arguments).map_err(InstantiatorErrorKind::Factory)?;

        debug!(implementation = self.implementation.name, "Constructed");

        Ok(built)
    }
}

fn construct<S, I>(arguments: Arguments) -> Result<Built, InstantiateErrorKind>
where
    S: ?Sized + Send + Sync + 'static,
    I: Implements<S>,
{
    let implementation = Arc::new(I::construct(arguments)?);
    let disposer: Disposer = {
        let implementation = implementation.clone();
        Box::new(move || I::dispose(&implementation))
    };

    Ok(Built {
        instance: Instance::new(I::upcast(implementation)),
        disposers: vec![disposer],
    })
}

pub(crate) type BoxedFactory = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, ResolveErrorKind> + Send + Sync>;

#[must_use]
pub(crate) fn boxed_factory<S, F>(factory: F) -> BoxedFactory
where
    S: ?Sized + Send + Sync + 'static,
    F: Fn(&Resolver<'_>) -> Result<Arc<S>, ResolveErrorKind> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &Resolver<'_>| factory(resolver).map(Instance::new))
}

/// How a registration produces its instance
#[derive(Clone)]
pub(crate) enum Activator {
    Constructor(Constructor),
    Factory(BoxedFactory),
    Instance(Instance),
}

impl Activator {
    #[inline]
    #[must_use]
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Activator::Constructor(_) => "constructor",
            Activator::Factory(_) => "factory",
            Activator::Instance(_) => "instance",
        }
    }
}
