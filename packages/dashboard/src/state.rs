//! Load cycles and snapshot publication.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use civic_map_analytics::attribution;
use civic_map_analytics::missions::{filter_inspections, upcoming_inspections};
use civic_map_analytics_models::InspectionFilter;
use civic_map_analytics::risk::latest_risk_by_area;
use civic_map_domain_models::{
    Area, AreaOption, AreaRef, AreaRiskSnapshot, BuildingAgePoint, Facility, FacilityInspection,
    FacilityTypeMeta, LngLat, NewTicket, NoiseMeasurement, Ticket, TicketEvent, TicketReceipt,
};
use civic_map_spatial::AreaIndex;
use civic_map_store::{AreaScope, Capability, RemoteStore, StoreError};

use crate::views::MissionBoard;
use crate::{DashboardError, DashboardSnapshot, LoadRequest};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of a load cycle that did not fail.
enum Outcome {
    /// Nothing to fetch; the current snapshot already covers the request.
    Unchanged,
    /// Only the area list was refreshed.
    AreaList(Vec<Area>),
    /// A full load.
    Loaded(Box<Loaded>),
}

/// Joined data of a full load, ready to publish.
struct Loaded {
    areas: Vec<Area>,
    area_options: Vec<AreaOption>,
    facilities: Vec<Facility>,
    tickets: Vec<Ticket>,
    ticket_events: Vec<TicketEvent>,
    area_risk_snapshots: Vec<AreaRiskSnapshot>,
    facility_types: Vec<FacilityTypeMeta>,
    building_ages: Vec<BuildingAgePoint>,
    noise_measurements: Vec<NoiseMeasurement>,
    current_area_id: String,
    current_county: Option<String>,
}

/// Raw results of the fetch phase of a full load.
struct Fetched {
    areas: Vec<Area>,
    facilities: Vec<Facility>,
    tickets: Vec<Ticket>,
    inspections: Vec<FacilityInspection>,
    ticket_events: Vec<TicketEvent>,
    risk: Vec<AreaRiskSnapshot>,
    facility_types: Vec<FacilityTypeMeta>,
    building_ages: Vec<BuildingAgePoint>,
    noise_measurements: Vec<NoiseMeasurement>,
}

/// Dashboard state over a remote store.
///
/// Every load cycle takes a fresh request token. A cycle only publishes
/// its result if its token is still the latest when it finishes, so a slow
/// response never overwrites the result of a request started after it.
pub struct Dashboard<S> {
    store: S,
    snapshot: Mutex<Arc<DashboardSnapshot>>,
    latest_token: AtomicU64,
    last_request: Mutex<Option<LoadRequest>>,
}

impl<S: RemoteStore> Dashboard<S> {
    /// Creates an empty dashboard.
    pub fn new(store: S) -> Self {
        Self {
            store,
            snapshot: Mutex::new(Arc::new(DashboardSnapshot::default())),
            latest_token: AtomicU64::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        Arc::clone(&lock(&self.snapshot))
    }

    /// Runs a load cycle and returns the snapshot current afterwards.
    ///
    /// A failed cycle publishes its error message and keeps everything else
    /// from the previous snapshot.
    pub async fn load(&self, request: LoadRequest) -> Arc<DashboardSnapshot> {
        self.run(request, false).await
    }

    /// Replays the last request, bypassing the already-loaded checks.
    pub async fn retry(&self) -> Arc<DashboardSnapshot> {
        let request = lock(&self.last_request).clone().unwrap_or_default();
        log::info!("Retrying dashboard load {request:?}");
        self.run(request, true).await
    }

    /// Submits a citizen ticket.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Store`] if the store rejects the ticket.
    pub async fn submit_ticket(&self, ticket: &NewTicket) -> Result<TicketReceipt, DashboardError> {
        Ok(self.store.submit_ticket(ticket).await?)
    }

    /// Fetches the missions wall: stored missions plus the inspection feed
    /// of the loaded facilities, narrowed by `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Store`] if the missions cannot be fetched.
    pub async fn missions(
        &self,
        now: DateTime<Utc>,
        filter: &InspectionFilter,
    ) -> Result<MissionBoard, DashboardError> {
        let missions = self.store.missions().await?;

        let snapshot = {
            let mut guard = lock(&self.snapshot);
            let mut next = DashboardSnapshot::clone(&guard);
            next.missions.clone_from(&missions);
            *guard = Arc::new(next);
            Arc::clone(&guard)
        };

        Ok(MissionBoard {
            missions,
            upcoming: filter_inspections(
                upcoming_inspections(&snapshot.facilities, &snapshot.areas, now),
                filter,
            ),
        })
    }

    async fn run(&self, request: LoadRequest, force: bool) -> Arc<DashboardSnapshot> {
        let token = self.latest_token.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.last_request) = Some(request.clone());

        match self.cycle(token, &request, force).await {
            Ok(Outcome::Unchanged) => self.update(token, |s| s.loading = false),
            Ok(Outcome::AreaList(areas)) => self.update(token, |s| {
                s.area_options = areas.iter().map(AreaOption::from).collect();
                s.areas = areas;
                s.loading = false;
                s.error = None;
            }),
            Ok(Outcome::Loaded(loaded)) => self.update(token, |s| publish(s, *loaded)),
            Err(e) => {
                log::error!("Dashboard load {request:?} failed: {e}");
                self.update(token, |s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
            }
        }

        self.snapshot()
    }

    /// Replaces the snapshot with an edited copy, unless a newer request
    /// has started since `token` was issued.
    fn update(&self, token: u64, edit: impl FnOnce(&mut DashboardSnapshot)) {
        let mut guard = lock(&self.snapshot);
        let latest = self.latest_token.load(Ordering::SeqCst);
        if token != latest {
            log::debug!("Discarding result of request {token}, request {latest} is newer");
            return;
        }
        let mut next = DashboardSnapshot::clone(&guard);
        edit(&mut next);
        *guard = Arc::new(next);
    }

    async fn cycle(
        &self,
        token: u64,
        request: &LoadRequest,
        force: bool,
    ) -> Result<Outcome, DashboardError> {
        if !force && !request.light_areas && request.area_id.is_none() {
            if let Some(center) = request.center {
                if self.snapshot().covers(center) {
                    log::debug!("Center {center:?} is inside the loaded county, skipping fetch");
                    return Ok(Outcome::Unchanged);
                }
            }
        }

        let light_only =
            request.light_areas && request.area_id.is_none() && request.center.is_none();
        let needs_geometry = !request.light_areas || request.center.is_some();
        self.update(token, |s| {
            s.loading = !request.names_only;
            s.error = None;
        });

        let area_from_point = match request.center {
            Some(center) => self.resolve_area_by_point(center).await?,
            None => None,
        };

        let current = self.snapshot();
        let county = area_from_point
            .as_ref()
            .map(|a| a.county.clone())
            .filter(|c| !c.is_empty())
            .or_else(|| current.current_county.clone());
        let tentative = request
            .area_id
            .clone()
            .or_else(|| area_from_point.as_ref().map(|a| a.id.clone()));

        if !force
            && tentative.is_some()
            && county.is_some()
            && current.current_area_id == tentative
            && current.current_county == county
            && !current.facilities.is_empty()
            && !current.tickets.is_empty()
        {
            log::debug!("Area {tentative:?} of {county:?} already loaded");
            return Ok(Outcome::Unchanged);
        }

        let scope = match (&county, &tentative) {
            (Some(county), _) => AreaScope::County(county.clone()),
            (None, Some(area_id)) => AreaScope::Area(area_id.clone()),
            (None, None) => AreaScope::All,
        };
        let areas = self.store.areas(&scope, needs_geometry).await?;
        if let Some(area) = areas.iter().find(|a| a.county.trim().is_empty()) {
            return Err(DashboardError::MissingCounty {
                area_id: area.id.clone(),
            });
        }

        if light_only && request.names_only {
            return Ok(Outcome::AreaList(areas));
        }

        let target = match (&request.area_id, &area_from_point) {
            (Some(area_id), _) => Some(area_id.clone()),
            (None, Some(found)) => Some(found.id.clone()),
            (None, None) => {
                let picked = if needs_geometry {
                    request.center.and_then(|center| {
                        AreaIndex::build(&areas)
                            .pick_by_center(center)
                            .map(str::to_string)
                    })
                } else {
                    None
                };
                picked.or_else(|| areas.first().map(|a| a.id.clone()))
            }
        }
        .ok_or(DashboardError::NoArea)?;

        let current = self.snapshot();
        if !force
            && current.current_area_id.as_deref() == Some(target.as_str())
            && !current.facilities.is_empty()
        {
            log::debug!("Area {target} already loaded");
            return Ok(Outcome::Unchanged);
        }

        log::info!("Loading area {target} ({scope:?})");
        let fetched = self.fetch(&target, areas).await?;
        Ok(Outcome::Loaded(Box::new(join(&target, county, fetched))))
    }

    async fn fetch(&self, target: &str, areas: Vec<Area>) -> Result<Fetched, DashboardError> {
        let facilities = self.facilities_for(target, &areas).await?;
        let tickets = self.tickets_for(target, &areas, &facilities).await?;

        let (risk, facility_types) =
            tokio::try_join!(self.store.area_risk_snapshots(), self.store.facility_types())?;

        let facility_ids: Vec<String> = facilities.iter().map(|f| f.id.clone()).collect();
        let ticket_ids: Vec<String> = tickets.iter().map(|t| t.id.clone()).collect();
        let (inspections, ticket_events) = tokio::try_join!(
            self.store.facility_inspections(&facility_ids),
            self.store.ticket_events(&ticket_ids),
        )?;

        let capabilities = self.store.capabilities();
        let building_ages = if capabilities.has(Capability::BuildingAges) {
            self.store.building_ages().await?
        } else {
            Vec::new()
        };
        let noise_measurements = if capabilities.has(Capability::NoiseMeasurements) {
            self.store.noise_measurements().await?
        } else {
            Vec::new()
        };

        Ok(Fetched {
            areas,
            facilities,
            tickets,
            inspections,
            ticket_events,
            risk,
            facility_types,
            building_ages,
            noise_measurements,
        })
    }

    async fn resolve_area_by_point(&self, center: LngLat) -> Result<Option<AreaRef>, StoreError> {
        if self.store.capabilities().has(Capability::FindAreaByPoint) {
            match self.store.find_area_by_point(center).await {
                Err(StoreError::MissingProcedure { message }) => {
                    log::warn!("find_area_by_point unavailable ({message}), resolving locally");
                }
                result => return result,
            }
        }

        let areas = self.store.areas(&AreaScope::All, true).await?;
        let index = AreaIndex::build(&areas);
        Ok(index.pick_by_center(center).and_then(|id| {
            areas.iter().find(|a| a.id == id).map(|a| AreaRef {
                id: a.id.clone(),
                county: a.county.clone(),
            })
        }))
    }

    async fn facilities_for(&self, target: &str, areas: &[Area]) -> Result<Vec<Facility>, StoreError> {
        if self.store.capabilities().has(Capability::FacilitiesInArea) {
            match self.store.facilities_in_area(target).await {
                Err(StoreError::MissingProcedure { message }) => {
                    log::warn!("facilities_in_area unavailable ({message}), filtering locally");
                }
                result => return result,
            }
        }

        let all = self.store.all_facilities().await?;
        let index = AreaIndex::build(areas);
        Ok(attribution::facilities_in_area(&index, target, &all)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn tickets_for(
        &self,
        target: &str,
        areas: &[Area],
        facilities: &[Facility],
    ) -> Result<Vec<Ticket>, StoreError> {
        if self.store.capabilities().has(Capability::TicketsInArea) {
            match self.store.tickets_in_area(target).await {
                Err(StoreError::MissingProcedure { message }) => {
                    log::warn!("tickets_in_area unavailable ({message}), filtering locally");
                }
                result => return result,
            }
        }

        let all = self.store.all_tickets().await?;
        let index = AreaIndex::build(areas);
        Ok(attribution::tickets_in_area(&index, target, &all, facilities)
            .into_iter()
            .cloned()
            .collect())
    }
}

/// Joins fetched rows: latest inspection and type metadata per facility,
/// latest stored risk per area, and areas narrowed to the target's county.
fn join(target: &str, county_filter: Option<String>, fetched: Fetched) -> Loaded {
    let Fetched {
        mut areas,
        mut facilities,
        tickets,
        inspections,
        ticket_events,
        risk,
        facility_types,
        building_ages,
        noise_measurements,
    } = fetched;

    let mut latest_inspection: BTreeMap<&str, &FacilityInspection> = BTreeMap::new();
    for inspection in &inspections {
        latest_inspection
            .entry(inspection.facility_id.as_str())
            .and_modify(|current| {
                if inspection.inspected_at > current.inspected_at {
                    *current = inspection;
                }
            })
            .or_insert(inspection);
    }
    let meta: BTreeMap<&str, &FacilityTypeMeta> = facility_types
        .iter()
        .map(|m| (m.facility_type.as_str(), m))
        .collect();

    for facility in &mut facilities {
        if let Some(inspection) = latest_inspection.get(facility.id.as_str()) {
            facility.last_inspection = Some(inspection.inspected_at);
            facility.incidents_past_year = inspection.incident_count_last_year;
            facility.latest_inspection_notes.clone_from(&inspection.notes);
        }
        if let Some(meta) = meta.get(facility.facility_type.as_str()) {
            facility.type_label = Some(meta.label.clone());
            facility.type_emoji.clone_from(&meta.emoji);
            facility.type_icon_name.clone_from(&meta.icon_name);
        }
    }

    let latest_risk = latest_risk_by_area(&risk);
    for area in &mut areas {
        area.risk_score = latest_risk.get(&area.id).copied();
    }

    let area_options: Vec<AreaOption> = areas.iter().map(AreaOption::from).collect();
    let target_county = areas
        .iter()
        .find(|a| a.id == target)
        .map(|a| a.county.clone());
    let areas: Vec<Area> = match &target_county {
        Some(county) => areas.into_iter().filter(|a| a.county == *county).collect(),
        None => areas.into_iter().filter(|a| a.id == target).collect(),
    };
    let area_risk_snapshots = risk
        .into_iter()
        .filter(|r| areas.iter().any(|a| a.id == r.area_id))
        .collect();

    Loaded {
        areas,
        area_options,
        facilities,
        tickets,
        ticket_events,
        area_risk_snapshots,
        facility_types,
        building_ages,
        noise_measurements,
        current_area_id: target.to_string(),
        current_county: target_county.or(county_filter),
    }
}

fn publish(snapshot: &mut DashboardSnapshot, loaded: Loaded) {
    if snapshot.area_options.is_empty() {
        snapshot.area_options = loaded.area_options;
    }
    snapshot.areas = loaded.areas;
    snapshot.facilities = loaded.facilities;
    snapshot.tickets = loaded.tickets;
    snapshot.ticket_events = loaded.ticket_events;
    snapshot.area_risk_snapshots = loaded.area_risk_snapshots;
    snapshot.facility_types = loaded.facility_types;
    snapshot.building_ages = loaded.building_ages;
    snapshot.noise_measurements = loaded.noise_measurements;
    snapshot.current_area_id = Some(loaded.current_area_id);
    snapshot.current_county = loaded.current_county;
    snapshot.loading = false;
    snapshot.error = None;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::TimeZone as _;
    use civic_map_domain_models::{AreaGeometry, Mission, SeverityLevel, TicketStatus};
    use civic_map_store::{Capabilities, NOT_CONFIGURED_MESSAGE};
    use tokio::sync::Notify;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn square(id: &str, county: &str, x0: f64) -> Area {
        Area {
            id: id.to_string(),
            name: format!("Area {id}"),
            code: None,
            county: county.to_string(),
            geometry: Some(AreaGeometry::Polygon(vec![vec![
                [x0, 0.0],
                [x0 + 1.0, 0.0],
                [x0 + 1.0, 1.0],
                [x0, 1.0],
                [x0, 0.0],
            ]])),
            population_total: None,
            gender_ratio: None,
            weighted_avg_age: None,
            risk_score: None,
        }
    }

    fn facility(id: &str, area_id: &str, x: f64) -> Facility {
        Facility {
            id: id.to_string(),
            area_id: Some(area_id.to_string()),
            facility_type: "park".to_string(),
            type_label: None,
            type_emoji: None,
            type_icon_name: None,
            name: format!("Facility {id}"),
            coords: Some(LngLat::new(x, 0.5)),
            grade: None,
            last_inspection: None,
            incidents_past_year: None,
            latest_inspection_notes: None,
        }
    }

    fn ticket(id: &str, facility_id: &str, area_id: &str) -> Ticket {
        Ticket {
            id: id.to_string(),
            area_id: Some(area_id.to_string()),
            facility_id: Some(facility_id.to_string()),
            coords: None,
            status: TicketStatus::Open,
            ticket_type: "pothole".to_string(),
            severity: Some(1),
            sla_due_at: None,
            created_at: None,
            description: None,
            photo_urls: Vec::new(),
        }
    }

    struct FakeStore {
        capabilities: Capabilities,
        areas: Vec<Area>,
        facilities: Vec<Facility>,
        tickets: Vec<Ticket>,
        inspections: Vec<FacilityInspection>,
        facility_fetches: AtomicUsize,
        gate: Option<(String, Notify)>,
        procedures_missing: bool,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                capabilities: [
                    Capability::FindAreaByPoint,
                    Capability::FacilitiesInArea,
                    Capability::TicketsInArea,
                ]
                .into_iter()
                .collect(),
                areas: vec![
                    square("a", "Taipei", 0.0),
                    square("b", "Taipei", 1.0),
                    square("c", "New Taipei", 5.0),
                ],
                facilities: vec![
                    facility("fa", "a", 0.5),
                    facility("fb", "b", 1.5),
                    facility("fc", "c", 5.5),
                ],
                tickets: vec![
                    ticket("ta", "fa", "a"),
                    ticket("tb", "fb", "b"),
                    ticket("tc", "fc", "c"),
                ],
                inspections: vec![
                    FacilityInspection {
                        facility_id: "fa".to_string(),
                        inspected_at: at(2025, 5, 1),
                        incident_count_last_year: Some(1),
                        notes: Some("Old notes".to_string()),
                    },
                    FacilityInspection {
                        facility_id: "fa".to_string(),
                        inspected_at: at(2025, 5, 25),
                        incident_count_last_year: Some(4),
                        notes: Some("Cracked path".to_string()),
                    },
                ],
                facility_fetches: AtomicUsize::new(0),
                gate: None,
                procedures_missing: false,
            }
        }

        fn without_capabilities(mut self) -> Self {
            self.capabilities = Capabilities::none();
            self
        }

        /// Advertises every procedure but answers each call as missing.
        fn without_procedures(mut self) -> Self {
            self.procedures_missing = true;
            self
        }

        fn missing_procedure(&self, name: &str) -> Result<(), StoreError> {
            if self.procedures_missing {
                return Err(StoreError::MissingProcedure {
                    message: format!("Could not find the function public.{name}"),
                });
            }
            Ok(())
        }

        fn fetches(&self) -> usize {
            self.facility_fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteStore for FakeStore {
        fn capabilities(&self) -> &Capabilities {
            &self.capabilities
        }

        async fn find_area_by_point(&self, point: LngLat) -> Result<Option<AreaRef>, StoreError> {
            self.missing_procedure("find_area_by_point")?;
            let index = AreaIndex::build(&self.areas);
            Ok(index.lookup(point).and_then(|id| {
                self.areas.iter().find(|a| a.id == id).map(|a| AreaRef {
                    id: a.id.clone(),
                    county: a.county.clone(),
                })
            }))
        }

        async fn areas(&self, scope: &AreaScope, with_geometry: bool) -> Result<Vec<Area>, StoreError> {
            Ok(self
                .areas
                .iter()
                .filter(|a| match scope {
                    AreaScope::County(county) => a.county == *county,
                    AreaScope::Area(id) => a.id == *id,
                    AreaScope::All => true,
                })
                .cloned()
                .map(|mut a| {
                    if !with_geometry {
                        a.geometry = None;
                    }
                    a
                })
                .collect())
        }

        async fn facilities_in_area(&self, area_id: &str) -> Result<Vec<Facility>, StoreError> {
            self.missing_procedure("facilities_in_area")?;
            if let Some((gated, notify)) = &self.gate {
                if gated == area_id {
                    notify.notified().await;
                }
            }
            self.facility_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .facilities
                .iter()
                .filter(|f| f.area_id.as_deref() == Some(area_id))
                .cloned()
                .collect())
        }

        async fn all_facilities(&self) -> Result<Vec<Facility>, StoreError> {
            self.facility_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.facilities.clone())
        }

        async fn tickets_in_area(&self, area_id: &str) -> Result<Vec<Ticket>, StoreError> {
            self.missing_procedure("tickets_in_area")?;
            Ok(self
                .tickets
                .iter()
                .filter(|t| t.area_id.as_deref() == Some(area_id))
                .cloned()
                .collect())
        }

        async fn all_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
            Ok(self.tickets.clone())
        }

        async fn facility_inspections(
            &self,
            facility_ids: &[String],
        ) -> Result<Vec<FacilityInspection>, StoreError> {
            Ok(self
                .inspections
                .iter()
                .filter(|i| facility_ids.contains(&i.facility_id))
                .cloned()
                .collect())
        }

        async fn ticket_events(&self, _ticket_ids: &[String]) -> Result<Vec<TicketEvent>, StoreError> {
            Ok(Vec::new())
        }

        async fn area_risk_snapshots(&self) -> Result<Vec<AreaRiskSnapshot>, StoreError> {
            Ok(vec![
                AreaRiskSnapshot {
                    area_id: "a".to_string(),
                    risk_score: 12.0,
                    computed_at: at(2025, 5, 1),
                },
                AreaRiskSnapshot {
                    area_id: "c".to_string(),
                    risk_score: 50.0,
                    computed_at: at(2025, 5, 1),
                },
            ])
        }

        async fn facility_types(&self) -> Result<Vec<FacilityTypeMeta>, StoreError> {
            Ok(vec![FacilityTypeMeta {
                facility_type: "park".to_string(),
                label: "公園".to_string(),
                emoji: Some("🌳".to_string()),
                icon_name: None,
            }])
        }

        async fn building_ages(&self) -> Result<Vec<BuildingAgePoint>, StoreError> {
            Ok(Vec::new())
        }

        async fn noise_measurements(&self) -> Result<Vec<NoiseMeasurement>, StoreError> {
            Ok(Vec::new())
        }

        async fn missions(&self) -> Result<Vec<Mission>, StoreError> {
            Ok(vec![Mission {
                id: "m1".to_string(),
                area_id: Some("a".to_string()),
                facility_id: Some("fa".to_string()),
                title: "Check the park lights".to_string(),
                description: None,
                mission_type: None,
                status: "open".to_string(),
                due_at: None,
            }])
        }

        async fn submit_ticket(&self, ticket: &NewTicket) -> Result<TicketReceipt, StoreError> {
            if ticket.description.is_empty() {
                return Err(StoreError::NotConfigured);
            }
            Ok(TicketReceipt {
                id: "t-new".to_string(),
                status: "open".to_string(),
            })
        }
    }

    fn at_center(lng: f64, lat: f64) -> LoadRequest {
        LoadRequest {
            center: Some(LngLat::new(lng, lat)),
            ..LoadRequest::default()
        }
    }

    fn for_area(id: &str) -> LoadRequest {
        LoadRequest {
            area_id: Some(id.to_string()),
            ..LoadRequest::default()
        }
    }

    #[tokio::test]
    async fn loads_county_of_center() {
        let dashboard = Dashboard::new(FakeStore::new());
        let snapshot = dashboard.load(at_center(0.5, 0.5)).await;

        assert_eq!(snapshot.error, None);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.current_area_id.as_deref(), Some("a"));
        assert_eq!(snapshot.current_county.as_deref(), Some("Taipei"));
        assert_eq!(
            snapshot.areas.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            ["a", "b"]
        );
        assert_eq!(snapshot.areas[0].risk_score, Some(12.0));
        assert_eq!(snapshot.area_risk_snapshots.len(), 1);

        let fa = &snapshot.facilities[0];
        assert_eq!(snapshot.facilities.len(), 1);
        assert_eq!(fa.last_inspection, Some(at(2025, 5, 25)));
        assert_eq!(fa.incidents_past_year, Some(4));
        assert_eq!(fa.latest_inspection_notes.as_deref(), Some("Cracked path"));
        assert_eq!(fa.type_label.as_deref(), Some("公園"));
        assert_eq!(snapshot.tickets.len(), 1);
    }

    #[tokio::test]
    async fn panning_inside_loaded_county_skips_fetch() {
        let dashboard = Dashboard::new(FakeStore::new());
        dashboard.load(at_center(0.5, 0.5)).await;
        assert_eq!(dashboard.store().fetches(), 1);

        let snapshot = dashboard.load(at_center(1.5, 0.5)).await;
        assert_eq!(dashboard.store().fetches(), 1);
        assert_eq!(snapshot.current_area_id.as_deref(), Some("a"));

        let snapshot = dashboard.load(at_center(5.5, 0.5)).await;
        assert_eq!(dashboard.store().fetches(), 2);
        assert_eq!(snapshot.current_area_id.as_deref(), Some("c"));
        assert_eq!(snapshot.current_county.as_deref(), Some("New Taipei"));
    }

    #[tokio::test]
    async fn retry_bypasses_loaded_check() {
        let dashboard = Dashboard::new(FakeStore::new());
        dashboard.load(for_area("a")).await;
        dashboard.load(for_area("a")).await;
        assert_eq!(dashboard.store().fetches(), 1);

        let snapshot = dashboard.retry().await;
        assert_eq!(dashboard.store().fetches(), 2);
        assert_eq!(snapshot.current_area_id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn area_without_county_fails_the_cycle() {
        let mut store = FakeStore::new();
        store.areas[0].county = "  ".to_string();
        let dashboard = Dashboard::new(store);

        let snapshot = dashboard.load(for_area("a")).await;
        assert!(!snapshot.loading);
        assert!(snapshot.facilities.is_empty());
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Area a has no county; every area needs its county column filled in")
        );
    }

    #[tokio::test]
    async fn filters_locally_without_capabilities() {
        let dashboard = Dashboard::new(FakeStore::new().without_capabilities());
        let snapshot = dashboard.load(at_center(1.5, 0.5)).await;

        assert_eq!(snapshot.error, None);
        assert_eq!(snapshot.current_area_id.as_deref(), Some("b"));
        assert_eq!(
            snapshot.facilities.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
            ["fb"]
        );
        assert_eq!(
            snapshot.tickets.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            ["tb"]
        );
    }

    #[tokio::test]
    async fn missing_procedures_fall_back_to_local_filtering() {
        let mut store = FakeStore::new().without_procedures();
        store.facilities.push(facility("fx", "a", 1.5));
        store.tickets.push(ticket("tx", "fx", "a"));
        let dashboard = Dashboard::new(store);
        assert!(dashboard.store().capabilities().has(Capability::FacilitiesInArea));

        let snapshot = dashboard.load(at_center(1.5, 0.5)).await;

        assert_eq!(snapshot.error, None);
        assert_eq!(snapshot.current_area_id.as_deref(), Some("b"));
        assert_eq!(snapshot.current_county.as_deref(), Some("Taipei"));
        assert_eq!(
            snapshot.facilities.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
            ["fb", "fx"]
        );
        assert_eq!(
            snapshot.tickets.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            ["tb", "tx"]
        );
    }

    #[tokio::test]
    async fn names_only_refreshes_area_list() {
        let dashboard = Dashboard::new(FakeStore::new());
        let snapshot = dashboard
            .load(LoadRequest {
                light_areas: true,
                names_only: true,
                ..LoadRequest::default()
            })
            .await;

        assert_eq!(snapshot.area_options.len(), 3);
        assert!(snapshot.areas.iter().all(|a| a.geometry.is_none()));
        assert!(snapshot.facilities.is_empty());
        assert_eq!(snapshot.current_area_id, None);
        assert_eq!(dashboard.store().fetches(), 0);
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let mut store = FakeStore::new();
        store.gate = Some(("a".to_string(), Notify::new()));
        let dashboard = Dashboard::new(store);

        tokio::join!(dashboard.load(for_area("a")), async {
            tokio::task::yield_now().await;
            dashboard.load(for_area("b")).await;
            if let Some((_, notify)) = &dashboard.store().gate {
                notify.notify_one();
            }
        });

        let snapshot = dashboard.snapshot();
        assert_eq!(dashboard.store().fetches(), 2);
        assert_eq!(snapshot.current_area_id.as_deref(), Some("b"));
        assert_eq!(
            snapshot.facilities.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
            ["fb"]
        );
    }

    #[tokio::test]
    async fn missions_include_upcoming_inspections() {
        let dashboard = Dashboard::new(FakeStore::new());
        dashboard.load(at_center(0.5, 0.5)).await;

        let board = dashboard
            .missions(at(2025, 6, 1), &InspectionFilter::default())
            .await
            .unwrap();
        assert_eq!(board.missions.len(), 1);
        assert_eq!(board.upcoming.len(), 1);
        assert_eq!(board.upcoming[0].due_in_days, 23);
        assert_eq!(dashboard.snapshot().missions, board.missions);

        let filter = InspectionFilter {
            facility_type: Some("cctv".to_string()),
            ..InspectionFilter::default()
        };
        let board = dashboard.missions(at(2025, 6, 1), &filter).await.unwrap();
        assert_eq!(board.missions.len(), 1);
        assert!(board.upcoming.is_empty());
    }

    #[tokio::test]
    async fn ticket_errors_are_displayable() {
        let dashboard = Dashboard::new(FakeStore::new());
        let mut form = NewTicket {
            facility_id: Some("fa".to_string()),
            area_id: Some("a".to_string()),
            issue_type: "pothole".to_string(),
            severity: SeverityLevel::Medium,
            description: "Deep hole".to_string(),
            coordinates: None,
        };

        let receipt = dashboard.submit_ticket(&form).await.unwrap();
        assert_eq!(receipt.id, "t-new");

        form.description.clear();
        let err = dashboard.submit_ticket(&form).await.unwrap_err();
        assert_eq!(err.to_string(), NOT_CONFIGURED_MESSAGE);
    }
}
