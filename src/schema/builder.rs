//! Builder used by [`ConfigSection::schema`](super::ConfigSection::schema).

use super::binding::{Field, FieldBinding, Projected};
use super::{ConfigSection, Constructor, FieldDescriptor, Schema};
use crate::document::Node;
use crate::value::ConfigValue;
use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use std::any::{Any, TypeId};
use std::collections::HashSet;

/// Key naming strategy applied to fields without an explicit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Snake,
    Kebab,
    Camel,
    Pascal,
    ScreamingSnake,
}

impl Case {
    pub fn apply(self, name: &str) -> String {
        match self {
            Case::Snake => name.to_snake_case(),
            Case::Kebab => name.to_kebab_case(),
            Case::Camel => name.to_lower_camel_case(),
            Case::Pascal => name.to_upper_camel_case(),
            Case::ScreamingSnake => name.to_shouty_snake_case(),
        }
    }
}

type Entry<S> = (FieldDescriptor, Box<dyn FieldBinding<S>>);

/// Declares the fields of a configuration type.
///
/// Modifiers such as [`key`](Self::key), [`comment`](Self::comment),
/// [`ignore`](Self::ignore) and [`changeable`](Self::changeable) apply to the
/// most recently declared field.
pub struct SchemaBuilder<S> {
    own: Vec<Entry<S>>,
    inherited: Vec<Entry<S>>,
    constructor: Option<Constructor<S>>,
    changeable: bool,
    node: Option<fn(&mut S) -> &mut Node>,
    case: Option<Case>,
}

impl<S: 'static> SchemaBuilder<S> {
    pub fn new() -> Self {
        Self {
            own: Vec::new(),
            inherited: Vec::new(),
            constructor: None,
            changeable: false,
            node: None,
            case: None,
        }
    }

    /// No-argument constructor used before fields are filled.
    pub fn constructor(mut self, ctor: fn() -> S) -> Self {
        self.constructor = Some(Constructor::Plain(ctor));
        self
    }

    /// Constructor that needs the enclosing instance of type `P`.
    ///
    /// The parent is passed as populated so far: fields declared before this
    /// one are already read from the document.
    pub fn constructor_with_parent<P: 'static>(mut self, ctor: fn(&P) -> S) -> Self {
        self.constructor = Some(Constructor::WithParent {
            parent: std::any::type_name::<P>(),
            build: Box::new(move |parent: &dyn Any| parent.downcast_ref::<P>().map(ctor)),
        });
        self
    }

    /// Declare a field stored under its name.
    pub fn field<T: ConfigValue>(
        mut self,
        name: &'static str,
        get: fn(&S) -> &T,
        get_mut: fn(&mut S) -> &mut T,
    ) -> Self {
        let descriptor = FieldDescriptor {
            name,
            key: name.to_string(),
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            shape: T::shape(),
            excluded: false,
            changeable: false,
            comments: Vec::new(),
            explicit_key: false,
        };
        self.own.push((descriptor, Box::new(Field { get, get_mut })));
        self
    }

    /// Store the last field under `key` instead of its name.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        let field = self.last_field("key");
        field.key = key.into();
        field.explicit_key = true;
        self
    }

    /// Add a comment line written above the last field.
    pub fn comment(mut self, line: impl Into<String>) -> Self {
        self.last_field("comment").comments.push(line.into());
        self
    }

    /// Exclude the last field from reading and writing.
    pub fn ignore(mut self) -> Self {
        self.last_field("ignore").excluded = true;
        self
    }

    /// Mark the last field's subtree as user-owned.
    ///
    /// The marker only takes effect on types reached through plain fields.
    /// Inside container elements the discovered path lacks the entry key, so
    /// the merge never matches it.
    pub fn changeable(mut self) -> Self {
        self.last_field("changeable").changeable = true;
        self
    }

    /// Mark every value of this type as user-owned wherever it is nested.
    pub fn changeable_section(mut self) -> Self {
        self.changeable = true;
        self
    }

    /// Derive keys of fields without an explicit key from their names.
    pub fn rename_all(mut self, case: Case) -> Self {
        self.case = Some(case);
        self
    }

    /// Include the fields of an embedded base type after this type's own
    /// fields. A base field is dropped when a field of the same name is
    /// declared here.
    pub fn inherit<B: ConfigSection>(
        mut self,
        get: fn(&S) -> &B,
        get_mut: fn(&mut S) -> &mut B,
    ) -> Self {
        let base = B::schema();
        for (descriptor, inner) in base.fields.into_iter().zip(base.bindings) {
            let binding: Box<dyn FieldBinding<S>> = Box::new(Projected {
                inner,
                get,
                get_mut,
            });
            self.inherited.push((descriptor, binding));
        }
        self
    }

    /// Slot that receives the whole merged document when this type is
    /// materialized as the root.
    pub fn node(mut self, get_mut: fn(&mut S) -> &mut Node) -> Self {
        self.node = Some(get_mut);
        self
    }

    pub fn build(self) -> Schema<S> {
        let case = self.case;
        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        let mut bindings = Vec::new();

        let own = self.own.into_iter().map(|(mut descriptor, binding)| {
            if let Some(case) = case
                && !descriptor.explicit_key
            {
                descriptor.key = case.apply(descriptor.name);
            }
            (descriptor, binding)
        });
        for (descriptor, binding) in own.chain(self.inherited) {
            if !seen.insert(descriptor.name) {
                continue;
            }
            fields.push(descriptor);
            bindings.push(binding);
        }

        Schema {
            type_name: std::any::type_name::<S>(),
            fields,
            bindings,
            constructor: self.constructor,
            changeable: self.changeable,
            node: self.node,
        }
    }

    fn last_field(&mut self, modifier: &str) -> &mut FieldDescriptor {
        match self.own.last_mut() {
            Some((descriptor, _)) => descriptor,
            None => panic!("`{}` must follow a `field` declaration", modifier),
        }
    }
}

impl<S: 'static> Default for SchemaBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Window {
        max_width: u32,
        title_text: String,
        fixed: bool,
    }

    impl ConfigSection for Window {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .rename_all(Case::Kebab)
                .field("max_width", |s| &s.max_width, |s| &mut s.max_width)
                .field("title_text", |s| &s.title_text, |s| &mut s.title_text)
                .field("fixed", |s| &s.fixed, |s| &mut s.fixed)
                .key("isFixed")
                .build()
        }
    }

    #[test]
    fn case_strategy_renames_implicit_keys() {
        let schema = Window::schema();
        let keys: Vec<_> = schema.fields().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["max-width", "title-text", "isFixed"]);
    }

    #[test]
    fn case_conversions() {
        assert_eq!(Case::Camel.apply("max_width"), "maxWidth");
        assert_eq!(Case::Pascal.apply("max_width"), "MaxWidth");
        assert_eq!(Case::ScreamingSnake.apply("max_width"), "MAX_WIDTH");
        assert_eq!(Case::Snake.apply("maxWidth"), "max_width");
    }

    #[test]
    #[should_panic(expected = "must follow a `field` declaration")]
    fn modifier_without_field_panics() {
        let _ = SchemaBuilder::<Window>::new().comment("orphan");
    }
}
