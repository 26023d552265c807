//! The staged generation pipeline.
//!
//! Stages run in a fixed order and each one sees the completed output of
//! the previous ones. Errors of a stage are collected in full before the
//! run stops, so one run reports every problem the stage can detect.

use bindplan_ast::TranslationUnit;
use bindplan_foundation::{Diagnostic, Diagnostics, Error, Failure};
use serde::Serialize;

use crate::annotate::AnnotationTable;
use crate::config::GeneratorConfig;
use crate::descriptor::EmissionRecord;
use crate::flatten::Flattening;
use crate::graph::ExposureGraph;
use crate::operators::OperatorTable;
use crate::properties::PropertyTable;
use crate::schedule::{Inputs, Schedule};
use crate::synthesize::synthesize;
use crate::templates::Instantiations;
use crate::visibility::Visibility;

/// Every derived structure of one run, up to and including the schedule.
#[derive(Clone, Debug)]
pub struct Analysis {
    /// The exposure graph.
    pub graph: ExposureGraph,
    /// Exposure decisions, with canonical instantiation names applied.
    pub visibility: Visibility,
    /// Template instantiations.
    pub instantiations: Instantiations,
    /// Flattened classes.
    pub flattening: Flattening,
    /// Class properties.
    pub properties: PropertyTable,
    /// Operator slots.
    pub operators: OperatorTable,
    /// Emission order.
    pub schedule: Schedule,
    /// Warnings raised so far.
    pub diagnostics: Diagnostics,
}

impl Analysis {
    /// Borrows the structures scheduling and synthesis read.
    #[must_use]
    pub fn inputs(&self) -> Inputs<'_> {
        Inputs {
            graph: &self.graph,
            visibility: &self.visibility,
            flattening: &self.flattening,
            properties: &self.properties,
            operators: &self.operators,
        }
    }
}

/// The output of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Generation {
    /// Records in emission order.
    pub records: Vec<EmissionRecord>,
    /// Non-fatal diagnostics.
    pub warnings: Vec<Diagnostic>,
}

impl Generation {
    /// Renders the records as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }

    /// Renders the records as MessagePack with named fields.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(&self.records)
    }
}

/// Runs the pipeline with a fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    /// Creates a generator.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Runs every stage up to scheduling.
    ///
    /// # Errors
    /// Annotation and graph errors stop the run at once. Template,
    /// flattening, and property errors are collected together and stop the
    /// run before scheduling.
    pub fn analyze(&self, unit: &TranslationUnit) -> Result<Analysis, Failure> {
        let mut diagnostics = Diagnostics::new();

        log::debug!("annotating {} declarations", unit.len());
        let annotations = match AnnotationTable::build(unit, &mut diagnostics) {
            Ok(table) => table,
            Err(errors) => return Err(Failure::new(errors, diagnostics)),
        };

        let graph = match ExposureGraph::build(unit, &annotations) {
            Ok(graph) => graph,
            Err(errors) => return Err(Failure::new(errors, diagnostics)),
        };
        log::debug!("exposure graph has {} nodes", graph.len());

        let mut visibility = Visibility::resolve(&graph, &self.config);

        let mut errors: Vec<Error> = Vec::new();
        let instantiations =
            Instantiations::resolve(unit, &graph, &mut visibility, &mut diagnostics)
                .unwrap_or_else(|mut e| {
                    errors.append(&mut e);
                    Instantiations::default()
                });
        let flattening = Flattening::flatten(&graph, &visibility, &self.config, &mut diagnostics);
        let (flattening, properties) = match flattening {
            Ok(flattening) => {
                let properties = PropertyTable::collect(&graph, &visibility, &flattening)
                    .unwrap_or_else(|mut e| {
                        errors.append(&mut e);
                        PropertyTable::default()
                    });
                (flattening, properties)
            }
            Err(mut e) => {
                errors.append(&mut e);
                (Flattening::default(), PropertyTable::default())
            }
        };
        if !errors.is_empty() {
            log::debug!("stopping before scheduling: {} errors", errors.len());
            return Err(Failure::new(errors, diagnostics));
        }
        let operators = OperatorTable::build(&graph, &visibility, &flattening);

        let inputs = Inputs {
            graph: &graph,
            visibility: &visibility,
            flattening: &flattening,
            properties: &properties,
            operators: &operators,
        };
        let schedule = match Schedule::build(&inputs, &mut diagnostics) {
            Ok(schedule) => schedule,
            Err(errors) => return Err(Failure::new(errors, diagnostics)),
        };

        Ok(Analysis {
            graph,
            visibility,
            instantiations,
            flattening,
            properties,
            operators,
            schedule,
            diagnostics,
        })
    }

    /// Runs the whole pipeline.
    ///
    /// # Errors
    /// Returns every fatal error of the first failing stage, with the
    /// warnings raised before it.
    pub fn generate(&self, unit: &TranslationUnit) -> Result<Generation, Failure> {
        Ok(self.finish(self.analyze(unit)?))
    }

    /// Synthesizes the records of a completed analysis.
    #[must_use]
    pub fn finish(&self, analysis: Analysis) -> Generation {
        let records = synthesize(&analysis.inputs(), &analysis.schedule, &self.config);
        log::info!(
            "generated {} records with {} warnings",
            records.len(),
            analysis.diagnostics.warnings().len()
        );
        Generation {
            records,
            warnings: analysis.diagnostics.into_warnings(),
        }
    }
}
