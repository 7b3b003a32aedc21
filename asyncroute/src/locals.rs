use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type LocalsMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Typed values attached to a request while it moves through the chain.
///
/// One slot per type: inserting a second value of the same type replaces the
/// first.
#[derive(Default, Clone)]
pub struct Locals {
    inner: LocalsMap,
}

impl Locals {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.inner.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }
}
