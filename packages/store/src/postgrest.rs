//! [`RemoteStore`] over `PostgREST`.

use async_trait::async_trait;
use civic_map_domain_models::{
    Area, AreaRef, AreaRiskSnapshot, BuildingAgePoint, Facility, FacilityInspection,
    FacilityTypeMeta, LngLat, Mission, NewTicket, NoiseMeasurement, Ticket, TicketEvent,
    TicketReceipt,
};
use serde_json::json;

use crate::client::{PostgrestClient, Query};
use crate::rows::{
    AREA_COLUMNS_FULL, AREA_COLUMNS_LITE, AreaRefRow, AreaRow, BuildingAgeRow, FACILITY_COLUMNS,
    FacilityRow, FacilityTypeRow, InspectionRow, MissionRow, NoiseRow, ReceiptRow,
    RiskSnapshotRow, TICKET_COLUMNS, TicketEventRow, TicketRow, new_ticket_row,
};
use crate::{AreaScope, Capabilities, RemoteStore, StoreConfig, StoreError};

/// Maximum number of ids sent in one `in.(...)` filter.
const ID_CHUNK_SIZE: usize = 150;

/// The HTTP store. Without credentials every operation fails with
/// [`StoreError::NotConfigured`].
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Option<PostgrestClient>,
    capabilities: Capabilities,
}

impl PostgrestStore {
    /// A store that reports [`StoreError::NotConfigured`] for everything.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            client: None,
            capabilities: Capabilities::none(),
        }
    }

    /// Connects to the store and negotiates capabilities.
    ///
    /// `None` yields an unconfigured store. A failed negotiation is logged
    /// and leaves every capability off.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the HTTP client cannot be built.
    pub async fn connect(config: Option<StoreConfig>) -> Result<Self, StoreError> {
        let Some(config) = config else {
            return Ok(Self::unconfigured());
        };

        let client = PostgrestClient::new(&config)?;
        let capabilities = match Capabilities::negotiate(&client).await {
            Ok(caps) => caps,
            Err(e) => {
                log::error!("Capability negotiation with {} failed: {e}", config.url);
                Capabilities::none()
            }
        };
        log::info!(
            "Remote store {}: capabilities [{}]",
            config.url,
            capabilities
                .iter()
                .map(|c| c.as_ref().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            client: Some(client),
            capabilities,
        })
    }

    /// Reads [`StoreConfig::from_env`] and connects.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Http`] if the HTTP client cannot be built.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::connect(StoreConfig::from_env()).await
    }

    /// Whether store credentials were provided.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&PostgrestClient, StoreError> {
        self.client.as_ref().ok_or(StoreError::NotConfigured)
    }

    async fn select_by_ids<R: serde::de::DeserializeOwned + Send>(
        &self,
        table: &str,
        query: &Query,
        column: &str,
        ids: &[String],
    ) -> Result<Vec<R>, StoreError> {
        let client = self.client()?;
        let mut rows = Vec::new();
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let query = query.clone().in_list(column, chunk);
            rows.extend(client.select::<R>(table, &query).await?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl RemoteStore for PostgrestStore {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn find_area_by_point(&self, point: LngLat) -> Result<Option<AreaRef>, StoreError> {
        let rows: Vec<AreaRefRow> = self
            .client()?
            .rpc("find_area_by_point", &json!({"lng": point.lng, "lat": point.lat}))
            .await?;
        Ok(rows.into_iter().next().map(AreaRef::from))
    }

    async fn areas(&self, scope: &AreaScope, with_geometry: bool) -> Result<Vec<Area>, StoreError> {
        let columns = if with_geometry {
            AREA_COLUMNS_FULL
        } else {
            AREA_COLUMNS_LITE
        };
        let query = match scope {
            AreaScope::County(county) => Query::select(columns).eq("county", county),
            AreaScope::Area(id) => Query::select(columns).eq("id", id),
            AreaScope::All => Query::select(columns),
        }
        .order("name", true);

        let rows: Vec<AreaRow> = self.client()?.select("areas", &query).await?;
        Ok(rows.into_iter().map(Area::from).collect())
    }

    async fn facilities_in_area(&self, area_id: &str) -> Result<Vec<Facility>, StoreError> {
        let rows: Vec<FacilityRow> = self
            .client()?
            .rpc("facilities_in_area", &json!({"target_area_id": area_id}))
            .await?;
        Ok(rows.into_iter().map(Facility::from).collect())
    }

    async fn all_facilities(&self) -> Result<Vec<Facility>, StoreError> {
        let rows: Vec<FacilityRow> = self
            .client()?
            .select("facilities", &Query::select(FACILITY_COLUMNS))
            .await?;
        Ok(rows.into_iter().map(Facility::from).collect())
    }

    async fn tickets_in_area(&self, area_id: &str) -> Result<Vec<Ticket>, StoreError> {
        let rows: Vec<TicketRow> = self
            .client()?
            .rpc("tickets_in_area", &json!({"target_area_id": area_id}))
            .await?;
        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn all_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let rows: Vec<TicketRow> = self
            .client()?
            .select("tickets", &Query::select(TICKET_COLUMNS))
            .await?;
        Ok(rows.into_iter().map(Ticket::from).collect())
    }

    async fn facility_inspections(
        &self,
        facility_ids: &[String],
    ) -> Result<Vec<FacilityInspection>, StoreError> {
        let query = Query::select("facility_id,inspected_at,incident_count_last_year,notes")
            .order("inspected_at", false);
        let rows: Vec<InspectionRow> = self
            .select_by_ids("facility_inspections", &query, "facility_id", facility_ids)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(InspectionRow::into_inspection)
            .collect())
    }

    async fn ticket_events(&self, ticket_ids: &[String]) -> Result<Vec<TicketEvent>, StoreError> {
        let query =
            Query::select("ticket_id,event_type,created_at,data").order("created_at", true);
        let rows: Vec<TicketEventRow> = self
            .select_by_ids("ticket_events", &query, "ticket_id", ticket_ids)
            .await?;
        let mut events: Vec<TicketEvent> =
            rows.into_iter().filter_map(TicketEventRow::into_event).collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn area_risk_snapshots(&self) -> Result<Vec<AreaRiskSnapshot>, StoreError> {
        let query = Query::select("area_id,risk_score,computed_at").order("computed_at", false);
        let rows: Vec<RiskSnapshotRow> =
            self.client()?.select("area_risk_snapshots", &query).await?;
        Ok(rows
            .into_iter()
            .filter_map(RiskSnapshotRow::into_snapshot)
            .collect())
    }

    async fn facility_types(&self) -> Result<Vec<FacilityTypeMeta>, StoreError> {
        let rows: Vec<FacilityTypeRow> = self
            .client()?
            .select("facility_type_meta", &Query::select("type,label_zh,emoji,icon_name"))
            .await?;
        Ok(rows.into_iter().map(FacilityTypeMeta::from).collect())
    }

    async fn building_ages(&self) -> Result<Vec<BuildingAgePoint>, StoreError> {
        let rows: Vec<BuildingAgeRow> = self
            .client()?
            .select("building_ages", &Query::select("id,name,geom,age_years"))
            .await?;
        Ok(rows.into_iter().filter_map(BuildingAgeRow::into_point).collect())
    }

    async fn noise_measurements(&self) -> Result<Vec<NoiseMeasurement>, StoreError> {
        let rows: Vec<NoiseRow> = self
            .client()?
            .select(
                "noise_measurements",
                &Query::select("id,name,geom,morning,afternoon,night"),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(NoiseRow::into_measurement)
            .collect())
    }

    async fn missions(&self) -> Result<Vec<Mission>, StoreError> {
        let rows: Vec<MissionRow> = self
            .client()?
            .select(
                "missions",
                &Query::select("id,area_id,facility_id,title,description,type,status,due_at")
                    .order("due_at", true),
            )
            .await?;
        Ok(rows.into_iter().map(Mission::from).collect())
    }

    async fn submit_ticket(&self, ticket: &NewTicket) -> Result<TicketReceipt, StoreError> {
        let client = self.client()?;
        let receipt: ReceiptRow = client
            .insert("tickets", &new_ticket_row(ticket), "id,status")
            .await?;
        log::info!("Ticket {} submitted ({})", receipt.id, ticket.issue_type);
        Ok(receipt.into())
    }
}
