//! Cascading region, sub-region and locality selection
//!
//! Selecting a level synchronously clears every dependent selection and
//! dependent option list, then hands back a [`FetchTicket`] for the async
//! reload of the next level. Tickets carry the selection epoch they were
//! issued under: if the selection moves again before the fetch resolves,
//! the stale result is discarded on arrival instead of clobbering the
//! newer lists.

use crate::model::{LocalityOption, LocationOption};

/// The three levels of the location chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeLevel {
    Region,
    SubRegion,
    Locality,
}

/// Current selection at each level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeSelection {
    pub region: Option<LocationOption>,
    pub sub_region: Option<LocationOption>,
    pub locality: Option<LocalityOption>,
}

impl CascadeSelection {
    /// Whether the chain is resolved down to a locality
    pub fn is_complete(&self) -> bool {
        self.region.is_some() && self.sub_region.is_some() && self.locality.is_some()
    }
}

/// Ticket tying an in-flight option fetch to the epoch it was issued under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    epoch: u64,
    /// Level whose options the fetch will produce
    pub level: CascadeLevel,
    /// Region the fetch was scoped to
    pub region_code: i64,
    /// Sub-region the fetch was scoped to, for locality fetches
    pub sub_region_code: Option<i64>,
}

/// What a selection change asks the caller to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Selection already held that value, nothing to do
    Unchanged,
    /// Selection cleared, dependents wiped, no fetch needed
    Cleared,
    /// Dependents wiped, fetch the next level with this ticket
    Fetch(FetchTicket),
}

/// Option lists and selection for the location chain
#[derive(Debug, Clone, Default)]
pub struct CascadeState {
    regions: Vec<LocationOption>,
    sub_regions: Vec<LocationOption>,
    localities: Vec<LocalityOption>,
    selection: CascadeSelection,
    epoch: u64,
}

impl CascadeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &CascadeSelection {
        &self.selection
    }

    pub fn regions(&self) -> &[LocationOption] {
        &self.regions
    }

    pub fn sub_regions(&self) -> &[LocationOption] {
        &self.sub_regions
    }

    pub fn localities(&self) -> &[LocalityOption] {
        &self.localities
    }

    /// Row id of the selected locality, once the chain is complete
    pub fn location_id(&self) -> Option<i64> {
        self.selection.locality.as_ref().map(|l| l.location_id)
    }

    /// Replace the top-level region list and reset everything below it
    pub fn set_regions(&mut self, regions: Vec<LocationOption>) {
        self.regions = regions;
        self.selection = CascadeSelection::default();
        self.sub_regions.clear();
        self.localities.clear();
        self.epoch += 1;
    }

    /// Drop the selection at every level, keeping the region list
    pub fn clear_selection(&mut self) {
        self.selection = CascadeSelection::default();
        self.sub_regions.clear();
        self.localities.clear();
        self.epoch += 1;
    }

    /// Invalidate any fetch issued before now without touching state.
    /// Used after restoring a snapshot, so a fetch started before the
    /// restore cannot apply onto the restored lists.
    pub fn invalidate_pending(&mut self) {
        self.epoch += 1;
    }

    /// Select a region. Dependent selections and lists are cleared before
    /// this returns; the ticket, when present, fetches the sub-region list.
    pub fn select_region(&mut self, region: Option<LocationOption>) -> SelectOutcome {
        if self.selection.region == region {
            return SelectOutcome::Unchanged;
        }
        self.selection.region = region;
        self.selection.sub_region = None;
        self.selection.locality = None;
        self.sub_regions.clear();
        self.localities.clear();
        self.epoch += 1;

        match &self.selection.region {
            Some(region) => SelectOutcome::Fetch(FetchTicket {
                epoch: self.epoch,
                level: CascadeLevel::SubRegion,
                region_code: region.code,
                sub_region_code: None,
            }),
            None => SelectOutcome::Cleared,
        }
    }

    /// Select a sub-region under the current region
    pub fn select_sub_region(&mut self, sub_region: Option<LocationOption>) -> SelectOutcome {
        let Some(region) = &self.selection.region else {
            return SelectOutcome::Unchanged;
        };
        let region_code = region.code;
        if self.selection.sub_region == sub_region {
            return SelectOutcome::Unchanged;
        }
        self.selection.sub_region = sub_region;
        self.selection.locality = None;
        self.localities.clear();
        self.epoch += 1;

        match &self.selection.sub_region {
            Some(sub) => SelectOutcome::Fetch(FetchTicket {
                epoch: self.epoch,
                level: CascadeLevel::Locality,
                region_code,
                sub_region_code: Some(sub.code),
            }),
            None => SelectOutcome::Cleared,
        }
    }

    /// Select a locality from the loaded list. Returns whether anything
    /// changed; localities have no dependents, so there is nothing to fetch.
    pub fn select_locality(&mut self, locality: Option<LocalityOption>) -> bool {
        if self.selection.locality == locality {
            return false;
        }
        self.selection.locality = locality;
        true
    }

    /// Install a fetched sub-region list. Returns false when the ticket is
    /// stale and the result was discarded.
    pub fn apply_sub_regions(&mut self, ticket: &FetchTicket, rows: Vec<LocationOption>) -> bool {
        if ticket.level != CascadeLevel::SubRegion || ticket.epoch != self.epoch {
            return false;
        }
        self.sub_regions = rows;
        true
    }

    /// Install a fetched locality list. Returns false when the ticket is
    /// stale and the result was discarded.
    pub fn apply_localities(&mut self, ticket: &FetchTicket, rows: Vec<LocalityOption>) -> bool {
        if ticket.level != CascadeLevel::Locality || ticket.epoch != self.epoch {
            return false;
        }
        self.localities = rows;
        true
    }
}
