//! Graph vocabulary: node labels, typed relations and their cardinality.
//!
//! Every relation is directed (`from -> to`) and declares two
//! cardinalities: how many `to` nodes a single `from` node may point at
//! ([`Relation::targets`]) and how many `from` nodes may point at a
//! single `to` node ([`Relation::sources`]). Stores validate both on every
//! connect and disconnect.

use std::fmt;

/// Node label. Each label is persisted in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Provider,
    Project,
    Region,
    Location,
    Service,
    Quota,
    Flavor,
    Image,
    Network,
    IdentityProvider,
    UserGroup,
    Sla,
}

impl Label {
    pub const ALL: [Label; 12] = [
        Label::Provider,
        Label::Project,
        Label::Region,
        Label::Location,
        Label::Service,
        Label::Quota,
        Label::Flavor,
        Label::Image,
        Label::Network,
        Label::IdentityProvider,
        Label::UserGroup,
        Label::Sla,
    ];

    /// Table name in the graph store.
    pub fn table(self) -> &'static str {
        match self {
            Label::Provider => "provider",
            Label::Project => "project",
            Label::Region => "region",
            Label::Location => "location",
            Label::Service => "service",
            Label::Quota => "quota",
            Label::Flavor => "flavor",
            Label::Image => "image",
            Label::Network => "network",
            Label::IdentityProvider => "identity_provider",
            Label::UserGroup => "user_group",
            Label::Sla => "sla",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ZeroOrOne,
    One,
    ZeroOrMore,
    OneOrMore,
}

impl Cardinality {
    pub fn min(self) -> u64 {
        match self {
            Cardinality::ZeroOrOne | Cardinality::ZeroOrMore => 0,
            Cardinality::One | Cardinality::OneOrMore => 1,
        }
    }

    /// Upper bound, `None` when unbounded.
    pub fn max(self) -> Option<u64> {
        match self {
            Cardinality::ZeroOrOne | Cardinality::One => Some(1),
            Cardinality::ZeroOrMore | Cardinality::OneOrMore => None,
        }
    }

    pub fn admits(self, count: u64) -> bool {
        count >= self.min() && self.max().is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cardinality::ZeroOrOne => "ZeroOrOne",
            Cardinality::One => "One",
            Cardinality::ZeroOrMore => "ZeroOrMore",
            Cardinality::OneOrMore => "OneOrMore",
        };
        f.write_str(s)
    }
}

/// Typed, directed relationship between two labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Provider -> Project it books for SLAs.
    ProviderProject,
    /// Provider -> Region.
    ProviderRegion,
    /// Provider -> trusted IdentityProvider. Carries an [`AuthMethod`].
    ///
    /// [`AuthMethod`]: crate::models::identity_provider::AuthMethod
    ProviderIdentityProvider,
    RegionLocation,
    RegionService,
    ProjectQuota,
    QuotaService,
    ServiceFlavor,
    ServiceImage,
    ServiceNetwork,
    /// Project -> private Flavor it can use.
    ProjectFlavor,
    ProjectImage,
    ProjectNetwork,
    IdentityProviderUserGroup,
    UserGroupSla,
    SlaProject,
}

impl Relation {
    pub const ALL: [Relation; 16] = [
        Relation::ProviderProject,
        Relation::ProviderRegion,
        Relation::ProviderIdentityProvider,
        Relation::RegionLocation,
        Relation::RegionService,
        Relation::ProjectQuota,
        Relation::QuotaService,
        Relation::ServiceFlavor,
        Relation::ServiceImage,
        Relation::ServiceNetwork,
        Relation::ProjectFlavor,
        Relation::ProjectImage,
        Relation::ProjectNetwork,
        Relation::IdentityProviderUserGroup,
        Relation::UserGroupSla,
        Relation::SlaProject,
    ];

    /// Edge table name in the graph store.
    pub fn edge(self) -> &'static str {
        match self {
            Relation::ProviderProject => "book_project",
            Relation::ProviderRegion => "divided_into",
            Relation::ProviderIdentityProvider => "trusts",
            Relation::RegionLocation => "located_at",
            Relation::RegionService => "supplies",
            Relation::ProjectQuota => "use_service_with",
            Relation::QuotaService => "apply_to",
            Relation::ServiceFlavor => "available_vm_flavor",
            Relation::ServiceImage => "available_vm_image",
            Relation::ServiceNetwork => "available_network",
            Relation::ProjectFlavor => "can_use_vm_flavor",
            Relation::ProjectImage => "can_use_vm_image",
            Relation::ProjectNetwork => "can_use_network",
            Relation::IdentityProviderUserGroup => "owns_group",
            Relation::UserGroupSla => "agree",
            Relation::SlaProject => "refer_to",
        }
    }

    pub fn from_label(self) -> Label {
        match self {
            Relation::ProviderProject
            | Relation::ProviderRegion
            | Relation::ProviderIdentityProvider => Label::Provider,
            Relation::RegionLocation | Relation::RegionService => Label::Region,
            Relation::ProjectQuota
            | Relation::ProjectFlavor
            | Relation::ProjectImage
            | Relation::ProjectNetwork => Label::Project,
            Relation::QuotaService => Label::Quota,
            Relation::ServiceFlavor | Relation::ServiceImage | Relation::ServiceNetwork => {
                Label::Service
            }
            Relation::IdentityProviderUserGroup => Label::IdentityProvider,
            Relation::UserGroupSla => Label::UserGroup,
            Relation::SlaProject => Label::Sla,
        }
    }

    pub fn to_label(self) -> Label {
        match self {
            Relation::ProviderProject | Relation::SlaProject => Label::Project,
            Relation::ProviderRegion => Label::Region,
            Relation::ProviderIdentityProvider => Label::IdentityProvider,
            Relation::RegionLocation => Label::Location,
            Relation::RegionService | Relation::QuotaService => Label::Service,
            Relation::ProjectQuota => Label::Quota,
            Relation::ServiceFlavor | Relation::ProjectFlavor => Label::Flavor,
            Relation::ServiceImage | Relation::ProjectImage => Label::Image,
            Relation::ServiceNetwork | Relation::ProjectNetwork => Label::Network,
            Relation::IdentityProviderUserGroup => Label::UserGroup,
            Relation::UserGroupSla => Label::Sla,
        }
    }

    /// How many `to` nodes a single `from` node may point at.
    pub fn targets(self) -> Cardinality {
        match self {
            Relation::RegionLocation => Cardinality::ZeroOrOne,
            Relation::QuotaService => Cardinality::One,
            Relation::SlaProject => Cardinality::OneOrMore,
            _ => Cardinality::ZeroOrMore,
        }
    }

    /// How many `from` nodes may point at a single `to` node.
    pub fn sources(self) -> Cardinality {
        match self {
            Relation::ProviderProject
            | Relation::ProviderRegion
            | Relation::RegionService
            | Relation::ProjectQuota
            | Relation::IdentityProviderUserGroup
            | Relation::UserGroupSla => Cardinality::One,
            Relation::ProviderIdentityProvider
            | Relation::ServiceFlavor
            | Relation::ServiceImage
            | Relation::ServiceNetwork => Cardinality::OneOrMore,
            Relation::SlaProject => Cardinality::ZeroOrOne,
            Relation::RegionLocation
            | Relation::QuotaService
            | Relation::ProjectFlavor
            | Relation::ProjectImage
            | Relation::ProjectNetwork => Cardinality::ZeroOrMore,
        }
    }

    /// Relations touching `label` on either end.
    pub fn touching(label: Label) -> impl Iterator<Item = Relation> {
        Self::ALL
            .into_iter()
            .filter(move |r| r.from_label() == label || r.to_label() == label)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.from_label(),
            self.edge(),
            self.to_label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn edge_tables_are_unique() {
        let edges: HashSet<_> = Relation::ALL.iter().map(|r| r.edge()).collect();
        assert_eq!(edges.len(), Relation::ALL.len());
    }

    #[test]
    fn edge_tables_do_not_shadow_node_tables() {
        for rel in Relation::ALL {
            assert!(Label::ALL.iter().all(|l| l.table() != rel.edge()));
        }
    }

    #[test]
    fn cardinality_bounds() {
        assert!(Cardinality::One.admits(1));
        assert!(!Cardinality::One.admits(0));
        assert!(!Cardinality::One.admits(2));
        assert!(Cardinality::ZeroOrOne.admits(0));
        assert!(Cardinality::OneOrMore.admits(7));
        assert!(!Cardinality::OneOrMore.admits(0));
    }

    #[test]
    fn touching_includes_both_directions() {
        let rels: Vec<_> = Relation::touching(Label::Project).collect();
        assert!(rels.contains(&Relation::ProviderProject));
        assert!(rels.contains(&Relation::ProjectQuota));
        assert!(rels.contains(&Relation::SlaProject));
        assert!(!rels.contains(&Relation::RegionService));
    }
}
