/// Parsed form of a field tag such as `"name,attr,omitempty"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldTag<'a> {
    /// Wire name; `None` means the field identifier is used.
    pub name: Option<&'a str>,
    /// The field never participates in encoding or decoding.
    pub skip: bool,
    /// The field lives in the attribute block.
    pub attribute: bool,
    /// The field is left out when it holds its empty value.
    pub omit_empty: bool,
    /// The field stands in for the whole encoded value.
    pub whole_value: bool,
}

impl<'a> FieldTag<'a> {
    /// Parses `tag`. Unknown directives are ignored and `value` overrides
    /// `attr`.
    pub fn parse(tag: &'a str) -> Self {
        if tag == "-" {
            return FieldTag {
                skip: true,
                ..FieldTag::default()
            };
        }

        let mut parts = tag.split(',');
        let name = parts.next().filter(|n| !n.is_empty());
        let mut result = FieldTag {
            name,
            ..FieldTag::default()
        };
        for directive in parts {
            match directive {
                "attr" => result.attribute = true,
                "omitempty" => result.omit_empty = true,
                "value" => result.whole_value = true,
                _ => {}
            }
        }
        if result.whole_value {
            result.attribute = false;
        }
        result
    }

    pub fn wire_name<'b>(&self, ident: &'b str) -> &'b str
    where
        'a: 'b,
    {
        self.name.unwrap_or(ident)
    }
}
