use std::collections::{HashMap, VecDeque};

use crate::FieldInfo;
use crate::tag::FieldTag;

/// Resolved mapping of one field to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata {
    pub ident: &'static str,
    pub wire_name: String,
    pub is_attribute: bool,
    pub omit_empty: bool,
    pub is_whole_value: bool,
    /// Declaration indices from the aggregate down through embedded members.
    pub path: Vec<usize>,
}

#[derive(Debug, Default)]
struct FieldSet {
    fields: Vec<FieldMetadata>,
    index: HashMap<String, usize>,
}

impl FieldSet {
    fn new(fields: Vec<FieldMetadata>) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.wire_name.clone(), i))
            .collect();
        FieldSet { fields, index }
    }

    fn get(&self, name: &str) -> Option<&FieldMetadata> {
        self.index.get(name).map(|&i| &self.fields[i])
    }
}

/// Field layout of an aggregate after tag parsing and embedding promotion.
#[derive(Debug, Default)]
pub struct TypeDescriptor {
    type_name: &'static str,
    attribute_fields: FieldSet,
    body_fields: FieldSet,
    whole_value_field: Option<FieldMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    Attribute(String),
    Body(String),
    WholeValue,
}

struct Candidate {
    field: FieldMetadata,
    depth: usize,
}

impl TypeDescriptor {
    /// Resolves `fields` into a descriptor.
    ///
    /// Embedded fields without an explicit name have their fields promoted.
    /// When promoted fields collide, the shallowest one wins; colliding
    /// fields at the same depth are all dropped.
    pub fn build(type_name: &'static str, fields: &'static [FieldInfo]) -> Self {
        let mut candidates = Vec::new();
        let mut queue = VecDeque::from([(fields, Vec::new(), 0usize)]);
        while let Some((fields, prefix, depth)) = queue.pop_front() {
            for (i, info) in fields.iter().enumerate() {
                let tag = FieldTag::parse(info.tag.unwrap_or(""));
                if tag.skip {
                    continue;
                }
                let mut path = prefix.clone();
                path.push(i);
                if let Some(embedded) = info.embedded
                    && tag.name.is_none()
                {
                    queue.push_back((embedded, path, depth + 1));
                    continue;
                }
                candidates.push(Candidate {
                    field: FieldMetadata {
                        ident: info.ident,
                        wire_name: tag.wire_name(info.ident).to_owned(),
                        is_attribute: tag.attribute,
                        omit_empty: tag.omit_empty,
                        is_whole_value: tag.whole_value,
                        path,
                    },
                    depth,
                });
            }
        }

        let mut slots: HashMap<Slot, Vec<Candidate>> = HashMap::new();
        for candidate in candidates {
            let slot = match &candidate.field {
                f if f.is_whole_value => Slot::WholeValue,
                f if f.is_attribute => Slot::Attribute(f.wire_name.clone()),
                f => Slot::Body(f.wire_name.clone()),
            };
            slots.entry(slot).or_default().push(candidate);
        }

        let mut survivors = Vec::new();
        for (slot, group) in slots {
            let Some(min_depth) = group.iter().map(|c| c.depth).min() else {
                continue;
            };
            let mut shallowest: Vec<_> = group.into_iter().filter(|c| c.depth == min_depth).collect();
            if shallowest.len() > 1 {
                tracing::debug!(
                    type_name,
                    ?slot,
                    count = shallowest.len(),
                    "dropping conflicting fields at equal depth"
                );
                continue;
            }
            survivors.extend(shallowest.pop().map(|c| c.field));
        }
        survivors.sort_by(|a, b| a.path.cmp(&b.path));

        let mut attributes = Vec::new();
        let mut body = Vec::new();
        let mut whole_value_field = None;
        for field in survivors {
            if field.is_whole_value {
                whole_value_field = Some(field);
            } else if field.is_attribute {
                attributes.push(field);
            } else {
                body.push(field);
            }
        }

        tracing::debug!(
            type_name,
            attributes = attributes.len(),
            body = body.len(),
            whole_value = whole_value_field.is_some(),
            "built type descriptor"
        );

        TypeDescriptor {
            type_name,
            attribute_fields: FieldSet::new(attributes),
            body_fields: FieldSet::new(body),
            whole_value_field,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn attribute_fields(&self) -> &[FieldMetadata] {
        &self.attribute_fields.fields
    }

    pub fn body_fields(&self) -> &[FieldMetadata] {
        &self.body_fields.fields
    }

    pub fn whole_value_field(&self) -> Option<&FieldMetadata> {
        self.whole_value_field.as_ref()
    }

    /// Looks up an attribute field by its exact wire name.
    pub fn attribute(&self, name: &str) -> Option<&FieldMetadata> {
        self.attribute_fields.get(name)
    }

    /// Looks up a body field by its exact wire name.
    pub fn body(&self, name: &str) -> Option<&FieldMetadata> {
        self.body_fields.get(name)
    }
}
