//! Resource identity.
//!
//! A tracked object is identified by the self-link kubectl reports for it,
//! e.g. `api/v1/namespaces/foo/pods/bar`. The string is stored verbatim and
//! only ever decoded, never built, so there is no encode side.

/// Reference to a live object in the form kubectl accepts on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// `<kind>/<name>`
    pub resource: String,
    /// Enclosing namespace, `None` for cluster-scoped objects
    pub namespace: Option<String>,
}

impl ObjectRef {
    /// Arguments that scope a kubectl command to this object's namespace.
    pub fn scope_args(&self) -> Vec<&str> {
        match &self.namespace {
            Some(ns) => vec!["-n", ns.as_str()],
            None => Vec::new(),
        }
    }
}

/// Decodes a stored identity into an object reference.
///
/// Implement this to track objects through a tool with a different
/// identity scheme.
pub trait IdentityCodec: Send + Sync {
    /// Decode `id`, returning `None` if it is not a valid identity.
    fn decode(&self, id: &str) -> Option<ObjectRef>;
}

/// Codec for Kubernetes self-links.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfLinkCodec;

impl IdentityCodec for SelfLinkCodec {
    fn decode(&self, id: &str) -> Option<ObjectRef> {
        decode(id)
    }
}

/// Decode a self-link.
///
/// The last two segments name the object. The segment after the first
/// `namespaces` segment, if any, is its namespace.
pub fn decode(selflink: &str) -> Option<ObjectRef> {
    let parts: Vec<&str> = selflink.split('/').collect();
    if parts.len() < 2 {
        return None;
    }
    let resource = format!("{}/{}", parts[parts.len() - 2], parts[parts.len() - 1]);

    let namespace = parts
        .windows(2)
        .find(|pair| pair[0] == "namespaces")
        .map(|pair| pair[1])
        .filter(|ns| !ns.is_empty())
        .map(str::to_string);

    Some(ObjectRef {
        resource,
        namespace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced() {
        let obj = decode("api/v1/namespaces/foo/pods/bar").unwrap();
        assert_eq!(obj.resource, "pods/bar");
        assert_eq!(obj.namespace.as_deref(), Some("foo"));
        assert_eq!(obj.scope_args(), vec!["-n", "foo"]);
    }

    #[test]
    fn test_cluster_scoped() {
        let obj = decode("apis/apps/v1/deployments/baz").unwrap();
        assert_eq!(obj.resource, "deployments/baz");
        assert_eq!(obj.namespace, None);
        assert!(obj.scope_args().is_empty());
    }

    #[test]
    fn test_single_segment_is_invalid() {
        assert_eq!(decode("x"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_two_segments() {
        let obj = decode("nodes/worker-1").unwrap();
        assert_eq!(obj.resource, "nodes/worker-1");
        assert_eq!(obj.namespace, None);
    }

    #[test]
    fn test_trailing_namespaces_marker() {
        let obj = decode("api/v1/namespaces").unwrap();
        assert_eq!(obj.resource, "v1/namespaces");
        assert_eq!(obj.namespace, None);
    }

    #[test]
    fn test_namespace_object_itself() {
        // A Namespace's own self-link names it as both object and scope
        let obj = decode("api/v1/namespaces/ns1").unwrap();
        assert_eq!(obj.resource, "namespaces/ns1");
        assert_eq!(obj.namespace.as_deref(), Some("ns1"));
    }

    #[test]
    fn test_codec_delegates() {
        let codec = SelfLinkCodec;
        assert_eq!(
            codec.decode("/api/v1/namespaces/ns1/widgets/w1"),
            decode("/api/v1/namespaces/ns1/widgets/w1")
        );
    }
}
