//! Static registry of resource endpoints
//!
//! Pure configuration data: one descriptor per resource type, fixed at
//! compile time, never mutated at runtime. The identifier field doubles as
//! the sort key for bulk reads.

/// Endpoint path and identifier field for one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Collection path relative to the API root, e.g. `advertisers`.
    pub path: &'static str,
    /// Name of the identifier field in record bodies.
    pub id_field: &'static str,
}

/// Advertiser accounts.
pub const ADVERTISERS: ResourceDescriptor =
    ResourceDescriptor { path: "advertisers", id_field: "id" };
/// Campaigns under an advertiser.
pub const CAMPAIGNS: ResourceDescriptor =
    ResourceDescriptor { path: "campaigns", id_field: "id" };
/// Line items under a campaign.
pub const LINE_ITEMS: ResourceDescriptor =
    ResourceDescriptor { path: "line_items", id_field: "id" };
/// Creatives attached to line items.
pub const CREATIVES: ResourceDescriptor =
    ResourceDescriptor { path: "creatives", id_field: "id" };
/// Audience segments.
pub const AUDIENCES: ResourceDescriptor =
    ResourceDescriptor { path: "audiences", id_field: "id" };
/// Programmatic deals.
pub const DEALS: ResourceDescriptor = ResourceDescriptor { path: "deals", id_field: "deal_id" };

const REGISTRY: &[ResourceDescriptor] =
    &[ADVERTISERS, CAMPAIGNS, LINE_ITEMS, CREATIVES, AUDIENCES, DEALS];

/// Look up a descriptor by its collection path.
#[must_use]
pub fn descriptor(name: &str) -> Option<&'static ResourceDescriptor> {
    REGISTRY.iter().find(|d| d.path == name)
}

/// All registered resource types.
#[must_use]
pub fn all() -> &'static [ResourceDescriptor] {
    REGISTRY
}
