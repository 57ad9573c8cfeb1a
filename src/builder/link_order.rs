//! Link-order override strategies.
//!
//! The graph compiler hands each module's default order (linkable objects
//! in declaration order) to a [`LinkOrderStrategy`] and links whatever it
//! returns. The compiler, not the strategy, checks the result.

use std::collections::BTreeMap;

use crate::core::manifest::Manifest;
use crate::core::module::ModuleId;

/// Rewrites a module's link order.
pub trait LinkOrderStrategy {
    /// Return the order in which `module`'s objects are linked.
    fn reorder(&self, module: ModuleId, objects: Vec<String>) -> Vec<String>;
}

/// Leaves every order untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl LinkOrderStrategy for Identity {
    fn reorder(&self, _module: ModuleId, objects: Vec<String>) -> Vec<String> {
        objects
    }
}

/// Replaces the order of listed modules with a fixed one.
#[derive(Debug, Clone, Default)]
pub struct ExplicitOrder {
    orders: BTreeMap<ModuleId, Vec<String>>,
}

impl ExplicitOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order<I, S>(mut self, module: ModuleId, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orders
            .insert(module, order.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl LinkOrderStrategy for ExplicitOrder {
    fn reorder(&self, module: ModuleId, objects: Vec<String>) -> Vec<String> {
        match self.orders.get(&module) {
            Some(order) => order.clone(),
            None => objects,
        }
    }
}

/// Appends extra objects to one module, but only for non-matching builds.
///
/// Useful for linking stubs or mods that only make sense once the image no
/// longer has to match.
#[derive(Debug, Clone)]
pub struct AppendInNonMatching {
    module: ModuleId,
    extra: Vec<String>,
    non_matching: bool,
}

impl AppendInNonMatching {
    pub fn new<I, S>(module: ModuleId, extra: I, non_matching: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppendInNonMatching {
            module,
            extra: extra.into_iter().map(Into::into).collect(),
            non_matching,
        }
    }
}

impl LinkOrderStrategy for AppendInNonMatching {
    fn reorder(&self, module: ModuleId, mut objects: Vec<String>) -> Vec<String> {
        if self.non_matching && module == self.module {
            objects.extend(self.extra.iter().cloned());
        }
        objects
    }
}

/// Runs strategies in sequence, each seeing the previous one's output.
pub struct Chain(pub Vec<Box<dyn LinkOrderStrategy + Send + Sync>>);

impl LinkOrderStrategy for Chain {
    fn reorder(&self, module: ModuleId, objects: Vec<String>) -> Vec<String> {
        self.0
            .iter()
            .fold(objects, |order, strategy| strategy.reorder(module, order))
    }
}

/// The strategy a manifest asks for: explicit per-module orders first,
/// then any objects appended for non-matching builds.
pub fn from_manifest(manifest: &Manifest) -> Chain {
    let mut strategies: Vec<Box<dyn LinkOrderStrategy + Send + Sync>> = Vec::new();

    let explicit = manifest
        .link_orders()
        .iter()
        .fold(ExplicitOrder::new(), |acc, (module, order)| {
            acc.with_order(*module, order.iter().cloned())
        });
    if !explicit.is_empty() {
        strategies.push(Box::new(explicit));
    }

    let non_matching = manifest.features().non_matching;
    for (module, extra) in manifest.non_matching_extras() {
        strategies.push(Box::new(AppendInNonMatching::new(
            *module,
            extra.iter().cloned(),
            non_matching,
        )));
    }

    Chain(strategies)
}

impl<F> LinkOrderStrategy for F
where
    F: Fn(ModuleId, Vec<String>) -> Vec<String>,
{
    fn reorder(&self, module: ModuleId, objects: Vec<String>) -> Vec<String> {
        self(module, objects)
    }
}
