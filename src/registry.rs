use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::{Aggregate, TypeDescriptor};

/// Cache of type descriptors keyed by type identity.
///
/// Descriptors are built on first use and never invalidated. Concurrent
/// first uses of the same type may both build a descriptor; only one of them
/// is retained.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    descriptors: DashMap<TypeId, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by readers and writers by default.
    pub fn global() -> Arc<TypeRegistry> {
        static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(TypeRegistry::new())))
    }

    /// Returns the descriptor for `T`, building it if needed.
    pub fn descriptor<T: Aggregate>(&self) -> Arc<TypeDescriptor> {
        let id = TypeId::of::<T>();
        if let Some(found) = self.descriptors.get(&id) {
            return Arc::clone(found.value());
        }
        // Built outside the map lock; a racing builder may win.
        let built = Arc::new(TypeDescriptor::build(T::NAME, T::FIELDS));
        let entry = self.descriptors.entry(id).or_insert(built);
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Resolves the field metadata of `T` through the global registry.
pub fn descriptor_of<T: Aggregate>() -> Arc<TypeDescriptor> {
    TypeRegistry::global().descriptor::<T>()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::TypeRegistry;
    use crate::{Aggregate, DecodeResult, EncodeResult, FieldInfo, Reader, Writer};

    struct Sample;

    impl Aggregate for Sample {
        const NAME: &'static str = "Sample";
        const FIELDS: &'static [FieldInfo] = &[FieldInfo {
            ident: "value",
            tag: Some("v"),
            embedded: None,
        }];

        fn decode_field(&mut self, _: &[usize], _: &mut Reader<'_>) -> DecodeResult<()> {
            Ok(())
        }

        fn encode_field(&self, _: &[usize], _: &mut Writer<'_>) -> EncodeResult<()> {
            Ok(())
        }

        fn field_is_empty(&self, _: &[usize]) -> Option<bool> {
            Some(true)
        }
    }

    #[test]
    fn test_single_descriptor_per_type() {
        let registry = Arc::new(TypeRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.descriptor::<Sample>())
            })
            .collect();
        let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        let retained = registry.descriptor::<Sample>();
        for d in &descriptors[1..] {
            assert_eq!(d.body_fields(), descriptors[0].body_fields());
        }
        assert_eq!(retained.body("v").map(|f| f.ident), Some("value"));
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&TypeRegistry::global(), &TypeRegistry::global()));
    }
}
