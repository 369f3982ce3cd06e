//! The assignment container: per-variable snapshots of bounds and activation
//! flags, used to store and restore solutions across searches and to
//! serialize them.

mod wire;

use std::io::Read;
use std::io::Write;

use log::warn;
use prost::Message;

use crate::basic_types::HashSet;
use crate::engine::variables::DomainId;
use crate::intervals::Interval;
use crate::sequences::SequenceId;
use wire::AssignmentRecord;
use wire::IntVarRecord;
use wire::IntervalVarRecord;
use wire::SequenceVarRecord;

/// The snapshot of one integer variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntVarElement {
    pub(crate) var: DomainId,
    pub(crate) name: String,
    pub(crate) min: i64,
    pub(crate) max: i64,
    pub(crate) active: bool,
}

impl IntVarElement {
    pub(crate) fn new(var: DomainId, name: String) -> Self {
        IntVarElement {
            var,
            name,
            min: 0,
            max: 0,
            active: true,
        }
    }

    pub fn var(&self) -> DomainId {
        self.var
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn value(&self) -> i64 {
        self.min
    }
}

/// The snapshot of one interval variable: all four dimensions as ranges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntervalElement {
    pub(crate) interval: Interval,
    pub(crate) name: String,
    pub(crate) start_min: i64,
    pub(crate) start_max: i64,
    pub(crate) duration_min: i64,
    pub(crate) duration_max: i64,
    pub(crate) end_min: i64,
    pub(crate) end_max: i64,
    pub(crate) performed_min: i64,
    pub(crate) performed_max: i64,
    pub(crate) active: bool,
}

impl IntervalElement {
    pub(crate) fn new(interval: Interval, name: String) -> Self {
        IntervalElement {
            interval,
            name,
            start_min: 0,
            start_max: 0,
            duration_min: 0,
            duration_max: 0,
            end_min: 0,
            end_max: 0,
            performed_min: 0,
            performed_max: 0,
            active: true,
        }
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn start_min(&self) -> i64 {
        self.start_min
    }

    pub fn start_max(&self) -> i64 {
        self.start_max
    }

    pub fn duration_min(&self) -> i64 {
        self.duration_min
    }

    pub fn duration_max(&self) -> i64 {
        self.duration_max
    }

    pub fn end_min(&self) -> i64 {
        self.end_min
    }

    pub fn end_max(&self) -> i64 {
        self.end_max
    }

    pub fn performed(&self) -> bool {
        self.performed_min == 1
    }
}

/// The snapshot of one sequence variable: the ranking as a list of indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceElement {
    pub(crate) sequence: SequenceId,
    pub(crate) name: String,
    pub(crate) ranking: Vec<i64>,
    pub(crate) active: bool,
}

impl SequenceElement {
    pub(crate) fn new(sequence: SequenceId, name: String) -> Self {
        SequenceElement {
            sequence,
            name,
            ranking: Vec::new(),
            active: true,
        }
    }

    pub fn sequence(&self) -> SequenceId {
        self.sequence
    }

    pub fn ranking(&self) -> &[i64] {
        &self.ranking
    }
}

/// A container of per-variable snapshots. Elements are added while building
/// the model; `store` (on the solver) copies the live state in, `restore`
/// pushes it back with the event queue frozen, and `save`/`load` serialize
/// the container keyed by variable name.
///
/// Variables without a name are dropped from `save`; duplicate names are
/// written once and warned about. `load` matches records to elements by name
/// and skips unknown names with a warning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
    pub(crate) integer_elements: Vec<IntVarElement>,
    pub(crate) interval_elements: Vec<IntervalElement>,
    pub(crate) sequence_elements: Vec<SequenceElement>,
    pub(crate) objective: Option<IntVarElement>,
}

impl Assignment {
    /// Add an integer variable to the container. The name is used as the
    /// serialization key.
    pub(crate) fn add_integer_element(&mut self, var: DomainId, name: String) {
        self.integer_elements.push(IntVarElement::new(var, name));
    }

    pub(crate) fn add_interval_element(&mut self, interval: Interval, name: String) {
        self.interval_elements
            .push(IntervalElement::new(interval, name));
    }

    pub(crate) fn add_sequence_element(&mut self, sequence: SequenceId, name: String) {
        self.sequence_elements
            .push(SequenceElement::new(sequence, name));
    }

    pub(crate) fn set_objective_element(&mut self, var: DomainId, name: String) {
        assert!(
            self.objective.is_none(),
            "an assignment can hold at most one objective"
        );
        self.objective = Some(IntVarElement::new(var, name));
    }

    pub fn integer_elements(&self) -> &[IntVarElement] {
        &self.integer_elements
    }

    pub fn interval_elements(&self) -> &[IntervalElement] {
        &self.interval_elements
    }

    pub fn sequence_elements(&self) -> &[SequenceElement] {
        &self.sequence_elements
    }

    pub fn objective(&self) -> Option<&IntVarElement> {
        self.objective.as_ref()
    }

    /// Write the container to the sink as one length-prefixed record.
    pub fn save(&self, sink: &mut dyn Write) -> std::io::Result<()> {
        let mut seen_names: HashSet<String> = HashSet::default();
        let mut usable = |name: &str| {
            if name.is_empty() {
                return false;
            }
            if !seen_names.insert(name.to_owned()) {
                warn!("skipping duplicate assignment entry {name}");
                return false;
            }
            true
        };

        let record = AssignmentRecord {
            integer_variables: self
                .integer_elements
                .iter()
                .filter(|element| usable(&element.name))
                .map(int_var_record)
                .collect(),
            interval_variables: self
                .interval_elements
                .iter()
                .filter(|element| usable(&element.name))
                .map(|element| IntervalVarRecord {
                    name: element.name.clone(),
                    start_min: element.start_min,
                    start_max: element.start_max,
                    duration_min: element.duration_min,
                    duration_max: element.duration_max,
                    end_min: element.end_min,
                    end_max: element.end_max,
                    performed_min: element.performed_min,
                    performed_max: element.performed_max,
                    active: element.active,
                })
                .collect(),
            sequence_variables: self
                .sequence_elements
                .iter()
                .filter(|element| usable(&element.name))
                .map(|element| SequenceVarRecord {
                    name: element.name.clone(),
                    active: element.active,
                    sequence: element.ranking.clone(),
                })
                .collect(),
            objective: self.objective.as_ref().map(int_var_record),
        };

        sink.write_all(&record.encode_length_delimited_to_vec())
    }

    /// Read one record from the source and overwrite the snapshots of the
    /// elements whose names match.
    pub fn load(&mut self, source: &mut dyn Read) -> std::io::Result<()> {
        let mut bytes = Vec::new();
        let _ = source.read_to_end(&mut bytes)?;
        let record = AssignmentRecord::decode_length_delimited(bytes.as_slice())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        for entry in &record.integer_variables {
            match self
                .integer_elements
                .iter_mut()
                .find(|element| element.name == entry.name)
            {
                Some(element) => {
                    element.min = entry.min;
                    element.max = entry.max;
                    element.active = entry.active;
                }
                None => warn!("no integer variable named {} to load into", entry.name),
            }
        }

        for entry in &record.interval_variables {
            match self
                .interval_elements
                .iter_mut()
                .find(|element| element.name == entry.name)
            {
                Some(element) => {
                    element.start_min = entry.start_min;
                    element.start_max = entry.start_max;
                    element.duration_min = entry.duration_min;
                    element.duration_max = entry.duration_max;
                    element.end_min = entry.end_min;
                    element.end_max = entry.end_max;
                    element.performed_min = entry.performed_min;
                    element.performed_max = entry.performed_max;
                    element.active = entry.active;
                }
                None => warn!("no interval variable named {} to load into", entry.name),
            }
        }

        for entry in &record.sequence_variables {
            match self
                .sequence_elements
                .iter_mut()
                .find(|element| element.name == entry.name)
            {
                Some(element) => {
                    element.ranking = entry.sequence.clone();
                    element.active = entry.active;
                }
                None => warn!("no sequence variable named {} to load into", entry.name),
            }
        }

        if let (Some(objective), Some(entry)) = (self.objective.as_mut(), record.objective) {
            objective.min = entry.min;
            objective.max = entry.max;
            objective.active = entry.active;
        }

        Ok(())
    }
}

fn int_var_record(element: &IntVarElement) -> IntVarRecord {
    IntVarRecord {
        name: element.name.clone(),
        min: element.min,
        max: element.max,
        active: element.active,
    }
}
