// Core data structures for the acompanar backend

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

lazy_static! {
    static ref TERM_RE: Regex = Regex::new(r"^\d{4}-\d$").expect("term pattern is valid");
}

/// Academic term identifier, constrained to the `YYYY-N` pattern
/// (four-digit year, dash, single digit, e.g. `2025-1`).
///
/// Construction goes through [`Term::from_str`] so a malformed identifier
/// is rejected at the boundary and never reaches the match engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Term(String);

/// Error for a term identifier that does not match `YYYY-N`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid term '{0}': expected YYYY-N format (e.g. 2025-1)")]
pub struct InvalidTerm(pub String);

impl Term {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Term {
    type Err = InvalidTerm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if TERM_RE.is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(InvalidTerm(s.to_string()))
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Deserialize an id field that upstream feeds deliver either as a JSON
/// string or as a bare number. Always normalized to a trimmed string.
pub fn de_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        // Spreadsheet exports deliver ids like 40228311.0
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.trim().to_string(),
        Raw::Integer(n) => n.to_string(),
        Raw::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", f as i64)
            } else {
                f.to_string()
            }
        }
    })
}

// ============================================================================
// Source records (produced by the upstream cleaning pipeline)
// ============================================================================

/// One scheduled session of a course section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    /// Weekday name as delivered by the source feed (e.g. "LUNES")
    pub dia: String,
    /// Time-of-day band (e.g. "08:00 - 10:00")
    pub hora: String,
    pub turno: Option<String>,
    pub edificio: Option<String>,
    pub sede: String,
    pub aula: Option<String>,
    pub estado: Option<String>,
}

/// A course with its ordered schedule slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub nombre: String,
    #[serde(default)]
    pub horarios: Vec<ScheduleSlot>,
}

/// Roster entry: one teacher needing accompaniment for one term.
/// Immutable once read by the match engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherTermRecord {
    pub periodo: Term,
    #[serde(deserialize_with = "de_id_string")]
    pub docente_id: String,
    pub nombre: String,
    pub rol: Option<String>,
    pub programa: Option<String>,
    pub modalidad: Option<String>,
    /// ESA score from the latest survey load
    pub esa: Option<f64>,
    #[serde(default)]
    pub cursos: Vec<Course>,
}

/// One (weekday, site, time-slot) tuple at which a specialist is free
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub dia: String,
    pub sede: String,
    pub franja: String,
}

/// Specialist availability record.
///
/// The `dni` natural key arrives as string or number depending on the
/// upload batch; it is normalized to a trimmed string on deserialization.
/// Preference fields are advisory metadata and are not consulted by the
/// matching decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistAvailability {
    #[serde(deserialize_with = "de_id_string")]
    pub dni: String,
    pub nombre_completo: String,
    #[serde(default)]
    pub disponibilidad: Vec<AvailabilitySlot>,
    pub modalidad: Option<String>,
    pub sede_preferida: Option<String>,
    pub segmento: Option<String>,
}

// ============================================================================
// Assignment state
// ============================================================================

/// Overall assignment status of a teacher within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignmentStatus {
    #[serde(rename = "Planificado")]
    Planificado,
    #[serde(rename = "Sin Asignar")]
    SinAsignar,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planificado => "Planificado",
            Self::SinAsignar => "Sin Asignar",
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Planificado" => Ok(Self::Planificado),
            "Sin Asignar" => Ok(Self::SinAsignar),
            other => Err(format!("unknown assignment status: {other}")),
        }
    }
}

/// Accompaniment annotation attached to a schedule slot once a specialist
/// is matched to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acompanamiento {
    pub especialista_dni: String,
    pub nombre_especialista: String,
    pub estado: AssignmentStatus,
    /// The availability tuple that matched this slot's key
    pub disponibilidad: AvailabilitySlot,
}

/// Schedule slot enriched with an optional accompaniment annotation.
/// Built fresh by the match engine; the raw roster record is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedSlot {
    #[serde(flatten)]
    pub horario: ScheduleSlot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acompanamiento: Option<Acompanamiento>,
}

/// Course with enriched schedule slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCourse {
    pub nombre: String,
    pub horarios: Vec<EnrichedSlot>,
}

/// Full recorded state of one teacher's assignment at one execution
/// timestamp. Inserted once per teacher per run, never updated; the most
/// recent `ejecutado_en` for a term is the current state.
///
/// Uniqueness invariant: (docente_id, especialista_dni, periodo, ejecutado_en).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSnapshot {
    pub periodo: Term,
    pub docente_id: String,
    pub nombre: String,
    pub rol: Option<String>,
    pub programa: Option<String>,
    pub modalidad: Option<String>,
    pub esa: Option<f64>,
    pub cursos: Vec<EnrichedCourse>,
    pub especialista_dni: Option<String>,
    pub nombre_especialista: Option<String>,
    pub estado_general: AssignmentStatus,
    pub ejecutado_en: DateTime<Utc>,
}

// ============================================================================
// Change tracking
// ============================================================================

/// Transition kind describing a teacher's outcome against their prior state.
/// Exactly one kind applies per teacher per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    #[serde(rename = "PERMANECE_SIN_ASIGNAR")]
    PermaneceSinAsignar,
    #[serde(rename = "ASIGNACION_NUEVA")]
    AsignacionNueva,
    #[serde(rename = "MANTENIDO")]
    Mantenido,
    #[serde(rename = "REASIGNADO")]
    Reasignado,
    #[serde(rename = "DESASIGNADO")]
    Desasignado,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermaneceSinAsignar => "PERMANECE_SIN_ASIGNAR",
            Self::AsignacionNueva => "ASIGNACION_NUEVA",
            Self::Mantenido => "MANTENIDO",
            Self::Reasignado => "REASIGNADO",
            Self::Desasignado => "DESASIGNADO",
        }
    }

    /// All five kinds, in classification-table order
    pub fn all() -> [TransitionKind; 5] {
        [
            Self::PermaneceSinAsignar,
            Self::AsignacionNueva,
            Self::Mantenido,
            Self::Reasignado,
            Self::Desasignado,
        ]
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERMANECE_SIN_ASIGNAR" => Ok(Self::PermaneceSinAsignar),
            "ASIGNACION_NUEVA" => Ok(Self::AsignacionNueva),
            "MANTENIDO" => Ok(Self::Mantenido),
            "REASIGNADO" => Ok(Self::Reasignado),
            "DESASIGNADO" => Ok(Self::Desasignado),
            other => Err(format!("unknown transition kind: {other}")),
        }
    }
}

/// Audit field carrying the specialist a teacher had before the run.
/// Fields default to null rather than being absent, so history documents
/// keep a stable shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspecialistaAnterior {
    pub dni: Option<String>,
    pub nombre: Option<String>,
}

/// Auditable history record: a snapshot plus the transition that produced
/// it and the previous specialist. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: AssignmentSnapshot,
    pub tipo_cambio: TransitionKind,
    pub especialista_anterior: EspecialistaAnterior,
}

// ============================================================================
// Notifications
// ============================================================================

/// Kind of a per-specialist notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "NUEVA_ASIGNACION")]
    NuevaAsignacion,
    #[serde(rename = "REASIGNACION_GANADA")]
    ReasignacionGanada,
    #[serde(rename = "REASIGNACION_PERDIDA")]
    ReasignacionPerdida,
    #[serde(rename = "DESASIGNACION")]
    Desasignacion,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NuevaAsignacion => "NUEVA_ASIGNACION",
            Self::ReasignacionGanada => "REASIGNACION_GANADA",
            Self::ReasignacionPerdida => "REASIGNACION_PERDIDA",
            Self::Desasignacion => "DESASIGNACION",
        }
    }

    /// Priority is a pure function of the kind: losing a teacher to a
    /// reassignment is the only medium-priority event.
    pub fn priority(&self) -> NotificationPriority {
        match self {
            Self::NuevaAsignacion | Self::ReasignacionGanada | Self::Desasignacion => {
                NotificationPriority::Alta
            }
            Self::ReasignacionPerdida => NotificationPriority::Media,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NUEVA_ASIGNACION" => Ok(Self::NuevaAsignacion),
            "REASIGNACION_GANADA" => Ok(Self::ReasignacionGanada),
            "REASIGNACION_PERDIDA" => Ok(Self::ReasignacionPerdida),
            "DESASIGNACION" => Ok(Self::Desasignacion),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// Notification priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationPriority {
    #[serde(rename = "ALTA")]
    Alta,
    #[serde(rename = "MEDIA")]
    Media,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alta => "ALTA",
            Self::Media => "MEDIA",
        }
    }
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALTA" => Ok(Self::Alta),
            "MEDIA" => Ok(Self::Media),
            other => Err(format!("unknown notification priority: {other}")),
        }
    }
}

/// Read-state lifecycle of a notification: unseen, then seen, then read or
/// archived. Transitions are simple field updates issued by the retrieval
/// endpoints, never by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadState {
    #[serde(rename = "NO_VISTA")]
    NoVista,
    #[serde(rename = "VISTA")]
    Vista,
    #[serde(rename = "LEIDA")]
    Leida,
    #[serde(rename = "ARCHIVADA")]
    Archivada,
}

impl ReadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoVista => "NO_VISTA",
            Self::Vista => "VISTA",
            Self::Leida => "LEIDA",
            Self::Archivada => "ARCHIVADA",
        }
    }
}

impl fmt::Display for ReadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReadState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO_VISTA" => Ok(Self::NoVista),
            "VISTA" => Ok(Self::Vista),
            "LEIDA" => Ok(Self::Leida),
            "ARCHIVADA" => Ok(Self::Archivada),
            other => Err(format!("unknown read state: {other}")),
        }
    }
}

/// Per-specialist notification produced by one match run.
///
/// `historial_id` references the persisted history record when the
/// transition was audited; transitions outside the audit policy still
/// notify but carry no reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub historial_id: Option<Uuid>,
    pub especialista_dni: String,
    pub nombre_especialista: Option<String>,
    pub tipo: NotificationKind,
    pub prioridad: NotificationPriority,
    pub estado: ReadState,
    // Denormalized change details so retrieval needs no join
    pub periodo: Term,
    pub docente_id: String,
    pub nombre_docente: String,
    pub tipo_cambio: TransitionKind,
    pub especialista_anterior: EspecialistaAnterior,
    pub creado_en: DateTime<Utc>,
    pub visto_en: Option<DateTime<Utc>>,
    pub leido_en: Option<DateTime<Utc>>,
}
