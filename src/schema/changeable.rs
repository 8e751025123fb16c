//! Discovery of user-owned document paths.

use super::{ConfigSection, SchemaInfo, schema_of};
use crate::document::join_path;
use crate::value::ObjectShape;
use std::any::TypeId;
use std::collections::BTreeSet;
use tracing::warn;

/// Dotted paths whose subtrees the merge must leave alone, found by walking
/// the schema of `S` and every section type reachable from it.
///
/// Container fields only lead into their element type when that type is a
/// section; elements add no path segment of their own. A type already being
/// visited on the current path is not entered again, but it is visited
/// normally when reached through a different path.
///
/// Markers found below a container element yield a path without the entry
/// key (`servers.acl`, not `servers.<name>.acl`), which the merge never
/// matches. They are still reported, and logged at warn level.
pub fn changeable_prefixes<S: ConfigSection>() -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut ancestors = vec![TypeId::of::<S>()];
    walk(&*schema_of::<S>(), "", false, &mut ancestors, &mut out);
    out
}

fn walk(
    info: &dyn SchemaInfo,
    path: &str,
    in_element: bool,
    ancestors: &mut Vec<TypeId>,
    out: &mut BTreeSet<String>,
) {
    for field in info.fields() {
        let full = join_path(path, &field.key);
        if field.changeable {
            mark(full, in_element, out);
            continue;
        }
        if let Some(object) = field.shape.object_within() {
            let in_element = in_element || field.shape.is_container();
            visit(object, &full, in_element, ancestors, out);
        }
    }
}

fn visit(
    object: ObjectShape,
    path: &str,
    in_element: bool,
    ancestors: &mut Vec<TypeId>,
    out: &mut BTreeSet<String>,
) {
    if ancestors.contains(&object.type_id) {
        return;
    }
    let info = (object.info)();
    if info.is_changeable() {
        mark(path.to_string(), in_element, out);
        return;
    }
    ancestors.push(object.type_id);
    walk(&*info, path, in_element, ancestors, out);
    ancestors.pop();
}

fn mark(path: String, in_element: bool, out: &mut BTreeSet<String>) {
    if in_element {
        warn!(path = %path, "changeable marker inside container elements never matches a stored path");
    }
    out.insert(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Role {
        name: String,
    }

    impl ConfigSection for Role {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .field("name", |s| &s.name, |s| &mut s.name)
                .build()
        }
    }
    crate::config_section!(Role);

    #[derive(Default)]
    struct Permissions {
        grants: HashMap<String, String>,
    }

    impl ConfigSection for Permissions {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .field("grants", |s| &s.grants, |s| &mut s.grants)
                .changeable()
                .build()
        }
    }
    crate::config_section!(Permissions);

    #[derive(Default)]
    struct Plugins {
        entries: HashMap<String, u32>,
    }

    impl ConfigSection for Plugins {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .changeable_section()
                .field("entries", |s| &s.entries, |s| &mut s.entries)
                .build()
        }
    }
    crate::config_section!(Plugins);

    #[derive(Default)]
    struct Tree {
        label: String,
        children: Vec<Tree>,
        perms: Permissions,
    }

    impl ConfigSection for Tree {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .field("label", |s| &s.label, |s| &mut s.label)
                .field("children", |s| &s.children, |s| &mut s.children)
                .field("perms", |s| &s.perms, |s| &mut s.perms)
                .build()
        }
    }
    crate::config_section!(Tree);

    #[derive(Default)]
    struct Root {
        users: HashMap<String, Role>,
        roles: HashMap<String, Role>,
        tags: Vec<String>,
        primary: Permissions,
        backup: Permissions,
        plugins: Plugins,
        tree: Tree,
    }

    impl ConfigSection for Root {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .field("users", |s| &s.users, |s| &mut s.users)
                .changeable()
                .field("roles", |s| &s.roles, |s| &mut s.roles)
                .field("tags", |s| &s.tags, |s| &mut s.tags)
                .field("primary", |s| &s.primary, |s| &mut s.primary)
                .field("backup", |s| &s.backup, |s| &mut s.backup)
                .key("secondary")
                .field("plugins", |s| &s.plugins, |s| &mut s.plugins)
                .field("tree", |s| &s.tree, |s| &mut s.tree)
                .build()
        }
    }

    #[test]
    fn collects_field_and_type_markers() {
        let paths = changeable_prefixes::<Root>();
        assert!(paths.contains("users"));
        assert!(paths.contains("primary.grants"));
        assert!(paths.contains("plugins"));
        assert!(!paths.contains("plugins.entries"));
        assert!(!paths.contains("roles"));
        assert!(!paths.contains("tags"));
    }

    #[test]
    fn same_type_is_visited_on_every_path() {
        let paths = changeable_prefixes::<Root>();
        assert!(paths.contains("primary.grants"));
        assert!(paths.contains("secondary.grants"));
    }

    #[test]
    fn recursive_types_terminate() {
        let paths = changeable_prefixes::<Root>();
        assert!(paths.contains("tree.perms.grants"));
        // Elements add no segment, and Tree is not re-entered below itself.
        assert!(!paths.contains("tree.children.perms.grants"));
    }

    #[derive(Default)]
    struct Cluster {
        servers: HashMap<String, Permissions>,
        primary: Permissions,
    }

    impl ConfigSection for Cluster {
        fn schema() -> Schema<Self> {
            Schema::<Self>::builder()
                .constructor(Self::default)
                .field("servers", |s| &s.servers, |s| &mut s.servers)
                .field("primary", |s| &s.primary, |s| &mut s.primary)
                .build()
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn marker_below_container_is_reported_with_warning() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let paths = tracing::subscriber::with_default(subscriber, changeable_prefixes::<Cluster>);

        assert!(paths.contains("servers.grants"));
        assert!(paths.contains("primary.grants"));
        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("WARN"));
        assert!(logs.contains("servers.grants"));
        assert!(!logs.contains("primary.grants"));
    }

    #[test]
    fn root_type_marker_is_ignored() {
        let paths = changeable_prefixes::<Plugins>();
        assert!(paths.is_empty());
    }
}
