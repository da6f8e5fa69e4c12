//! Structural editing of an outline.
//!
//! Every operation here checks all of its preconditions against the current
//! outline before the first write.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::{DependencyGraph, Outline};
use crate::{
    error::{OrchestratorError, Result},
    models::{Field, FieldDefinition, FieldId, FieldStatus, FieldUpdate, Section, SectionId},
    staleness::{self, StalenessReport},
};

/// Result of removing a single field.
#[derive(Debug, Clone)]
pub struct RemovedField {
    /// The field as it was before removal
    pub field: Field,
    /// Fields that listed the removed field in `depends_on`
    pub purged_from: Vec<FieldId>,
    /// Former dependents flagged stale by the removal
    pub stale_marked: Vec<FieldId>,
}

/// Result of removing a section and its fields.
#[derive(Debug, Clone)]
pub struct RemovedSection {
    /// The section as it was before removal
    pub section: Section,
    /// Number of fields removed with the section
    pub removed_fields: usize,
    /// How many of those held completed content
    pub completed_fields: usize,
    /// Fields in other sections flagged stale by the removal
    pub stale_marked: Vec<FieldId>,
}

/// Result of a field update.
#[derive(Debug, Clone)]
pub struct UpdatedField {
    /// The field after the update
    pub field: Field,
    /// Staleness propagation triggered by a content edit
    pub staleness: Option<StalenessReport>,
}

impl Outline {
    /// Appends a new, empty section and returns it.
    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Section {
        let taken = self.taken_section_ids();
        let id = Self::allocate_id("section", &taken, 1)
            .pop()
            .unwrap_or_else(|| format!("section_{}", taken.len() + 1));
        let section = Section::new(
            SectionId::new(id),
            name.into(),
            description.into(),
            self.sections.len() as u32,
        );
        debug!("Added section {} ({})", section.id, section.name);
        self.sections.push(section.clone());
        section
    }

    /// Instantiates fields from definitions and appends them to a section.
    ///
    /// The batch is sorted by definition `order` (ties keep their input
    /// position). Each `depends_on` entry resolves to, in order of
    /// preference: an existing field id, the name of another definition in
    /// the batch, or the name of an existing field in the same section.
    ///
    /// # Errors
    ///
    /// - `SectionNotFound` if the section does not exist
    /// - `Validation` for a blank or duplicate name, or an unresolvable
    ///   dependency; the whole batch is rejected
    /// - `Cycle` if the batch's dependencies form a cycle
    pub fn add_fields(
        &mut self,
        section_id: &SectionId,
        definitions: Vec<FieldDefinition>,
    ) -> Result<Vec<Field>> {
        let index = self.section_index(section_id)?;
        if definitions.is_empty() {
            return Ok(Vec::new());
        }

        let mut definitions = definitions;
        definitions.sort_by_key(|d| d.order);

        let section = &self.sections[index];
        let mut batch_names = HashSet::new();
        for definition in &definitions {
            let name = definition.name.trim();
            if name.is_empty() {
                return Err(OrchestratorError::validation("name")
                    .with_reason("field name must not be blank"));
            }
            if section.field_by_name(name).is_some() || !batch_names.insert(name) {
                return Err(OrchestratorError::validation("name").with_reason(format!(
                    "field '{name}' already exists in section '{}'",
                    section.id
                )));
            }
        }

        let ids: Vec<FieldId> = Self::allocate_id("field", &self.taken_field_ids(), definitions.len())
            .into_iter()
            .map(FieldId::new)
            .collect();
        let by_name: HashMap<&str, &FieldId> = definitions
            .iter()
            .map(|d| d.name.trim())
            .zip(ids.iter())
            .collect();

        let mut resolved = Vec::with_capacity(definitions.len());
        for (definition, id) in definitions.iter().zip(&ids) {
            let mut deps: Vec<FieldId> = Vec::new();
            for reference in &definition.depends_on {
                let dep = self.resolve_dependency(section, reference, &by_name)?;
                if &dep == id {
                    return Err(OrchestratorError::Cycle {
                        field: id.clone(),
                        dependency: dep,
                    });
                }
                if !deps.contains(&dep) {
                    deps.push(dep);
                }
            }
            resolved.push(deps);
        }

        let graph = DependencyGraph::from_edges(
            self.fields()
                .map(|f| (f.id.clone(), f.depends_on.clone()))
                .chain(ids.iter().cloned().zip(resolved.iter().cloned())),
        );
        if let Some((field, dependency)) = graph.find_cycle() {
            return Err(OrchestratorError::Cycle { field, dependency });
        }

        // Validated; apply.
        let section = &mut self.sections[index];
        let start = section.fields.len() as u32;
        let mut created = Vec::with_capacity(definitions.len());
        for (offset, ((definition, id), deps)) in
            definitions.iter().zip(ids).zip(resolved).enumerate()
        {
            let field = Field::from_definition(
                id,
                section.id.clone(),
                definition,
                start + offset as u32,
                deps,
            );
            created.push(field.id.clone());
            section.fields.push(field);
        }

        if !section.fields.iter().any(|f| f.is_chain_head) {
            if let Some(first) = section.fields.first_mut() {
                if first.depends_on.is_empty() {
                    first.is_chain_head = true;
                }
            }
        }
        debug!("Added {} fields to section {}", created.len(), section.id);

        self.rebuild_chains();
        Ok(created
            .iter()
            .filter_map(|id| self.field(id).cloned())
            .collect())
    }

    fn resolve_dependency(
        &self,
        section: &Section,
        reference: &str,
        batch: &HashMap<&str, &FieldId>,
    ) -> Result<FieldId> {
        let reference = reference.trim();
        let as_id = FieldId::from(reference);
        if self.field(&as_id).is_some() {
            return Ok(as_id);
        }
        if let Some(id) = batch.get(reference) {
            return Ok((*id).clone());
        }
        if let Some(field) = section.field_by_name(reference) {
            return Ok(field.id.clone());
        }
        Err(OrchestratorError::validation("depends_on")
            .with_reason(format!("no field with id or name '{reference}'")))
    }

    /// Removes a field from a section.
    ///
    /// Its former transitive dependents are flagged stale, then its id is
    /// purged from every `depends_on` list and its siblings are renumbered.
    ///
    /// # Errors
    ///
    /// - `SectionNotFound` / `FieldNotFound` for unknown ids
    /// - `Conflict` if the field is completed and `confirmed` is false
    pub fn remove_field(
        &mut self,
        section_id: &SectionId,
        field_id: &FieldId,
        confirmed: bool,
    ) -> Result<RemovedField> {
        let index = self.section_index(section_id)?;
        let position = self.sections[index]
            .fields
            .iter()
            .position(|f| &f.id == field_id)
            .ok_or_else(|| OrchestratorError::FieldNotFound {
                id: field_id.clone(),
            })?;
        let field = &self.sections[index].fields[position];
        if field.is_completed() && !confirmed {
            return Err(OrchestratorError::conflict(format!(
                "field '{}' has completed content; confirm to delete it",
                field.id
            )));
        }

        let report = staleness::propagate(self, field_id)?;
        let field = self.sections[index].fields.remove(position);
        let purged_from = self.purge_dependency(field_id);
        self.sections[index].renumber_fields();
        self.rebuild_chains();

        debug!("Removed field {} from section {}", field.id, section_id);
        Ok(RemovedField {
            field,
            purged_from,
            stale_marked: report.marked,
        })
    }

    /// Removes a section and every field in it.
    ///
    /// # Errors
    ///
    /// - `SectionNotFound` for an unknown id
    /// - `Conflict` if any field of the section is completed and `confirmed`
    ///   is false
    pub fn remove_section(
        &mut self,
        section_id: &SectionId,
        confirmed: bool,
    ) -> Result<RemovedSection> {
        let index = self.section_index(section_id)?;
        let section = &self.sections[index];
        let completed_fields = section.completed_count();
        if completed_fields > 0 && !confirmed {
            return Err(OrchestratorError::conflict(format!(
                "section '{}' has {completed_fields} completed field(s); confirm to delete it",
                section.id
            )));
        }

        let removed: HashSet<FieldId> = section.fields.iter().map(|f| f.id.clone()).collect();
        let mut stale_marked = Vec::new();
        for id in section.fields.iter().map(|f| f.id.clone()).collect::<Vec<_>>() {
            let report = staleness::propagate_excluding(self, &id, &removed)?;
            for marked in report.marked {
                if !stale_marked.contains(&marked) {
                    stale_marked.push(marked);
                }
            }
        }

        let section = self.sections.remove(index);
        for id in &removed {
            self.purge_dependency(id);
        }
        self.renumber_sections();
        self.rebuild_chains();

        debug!("Removed section {} with {} fields", section.id, removed.len());
        Ok(RemovedSection {
            removed_fields: section.fields.len(),
            completed_fields,
            section,
            stale_marked,
        })
    }

    /// Reorders the fields of a section. `new_order` must list every field
    /// id of the section exactly once.
    pub fn reorder_fields(&mut self, section_id: &SectionId, new_order: &[FieldId]) -> Result<()> {
        let index = self.section_index(section_id)?;
        let current: Vec<FieldId> = self.sections[index]
            .fields
            .iter()
            .map(|f| f.id.clone())
            .collect();
        check_permutation("field_order", &current, new_order)?;

        let section = &mut self.sections[index];
        let mut fields: HashMap<FieldId, Field> = section
            .fields
            .drain(..)
            .map(|f| (f.id.clone(), f))
            .collect();
        section.fields = new_order
            .iter()
            .filter_map(|id| fields.remove(id))
            .collect();
        section.renumber_fields();
        self.rebuild_chains();
        Ok(())
    }

    /// Reorders the sections. `new_order` must list every section id exactly
    /// once.
    pub fn reorder_sections(&mut self, new_order: &[SectionId]) -> Result<()> {
        let current: Vec<SectionId> = self.sections.iter().map(|s| s.id.clone()).collect();
        check_permutation("section_order", &current, new_order)?;

        let mut sections: HashMap<SectionId, Section> = self
            .sections
            .drain(..)
            .map(|s| (s.id.clone(), s))
            .collect();
        self.sections = new_order
            .iter()
            .filter_map(|id| sections.remove(id))
            .collect();
        self.renumber_sections();
        self.rebuild_chains();
        Ok(())
    }

    /// Applies a partial update to a field.
    ///
    /// A content edit marks the field completed, clears its own staleness and
    /// flags its transitive dependents stale. A replacement `depends_on` must
    /// reference existing fields and keep the graph acyclic.
    ///
    /// # Errors
    ///
    /// - `FieldNotFound` for an unknown id
    /// - `Validation` for an empty update or an unknown dependency
    /// - `Cycle` if the new dependencies would close a cycle
    pub fn update_field(&mut self, id: &FieldId, update: FieldUpdate) -> Result<UpdatedField> {
        self.require_field(id)?;
        if update.is_empty() {
            return Err(OrchestratorError::validation("update").with_reason("no changes requested"));
        }

        let deps = match &update.depends_on {
            Some(requested) => Some(self.validate_dependencies(id, requested)?),
            None => None,
        };

        let field = self.require_field_mut(id)?;
        if let Some(display_name) = update.display_name {
            field.display_name = display_name;
        }
        if let Some(description) = update.description {
            field.description = description;
        }
        let deps_changed = deps.is_some();
        if let Some(deps) = deps {
            field.depends_on = deps;
        }
        let content_edited = update.content.is_some();
        if let Some(content) = update.content {
            field.content = Some(content);
            field.status = FieldStatus::Completed;
            field.context_stale = false;
        }
        field.touch();

        if deps_changed {
            self.rebuild_chains();
        }
        let staleness = if content_edited {
            Some(staleness::propagate(self, id)?)
        } else {
            None
        };

        Ok(UpdatedField {
            field: self.require_field(id)?.clone(),
            staleness,
        })
    }

    /// Checks a replacement dependency list for `id` and returns it without
    /// duplicates.
    fn validate_dependencies(&self, id: &FieldId, requested: &[FieldId]) -> Result<Vec<FieldId>> {
        let mut deps: Vec<FieldId> = Vec::with_capacity(requested.len());
        for dep in requested {
            if dep == id {
                return Err(OrchestratorError::Cycle {
                    field: id.clone(),
                    dependency: dep.clone(),
                });
            }
            if self.field(dep).is_none() {
                return Err(OrchestratorError::validation("depends_on")
                    .with_reason(format!("unknown field '{dep}'")));
            }
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }

        let mut graph = self.dependency_graph();
        graph.set_dependencies(id, deps.clone());
        if let Some(dependency) = graph.cycle_through(id) {
            return Err(OrchestratorError::Cycle {
                field: id.clone(),
                dependency,
            });
        }
        Ok(deps)
    }

    /// Marks or unmarks a field as a chain head and recomputes chains.
    pub fn set_chain_head(&mut self, id: &FieldId, is_head: bool) -> Result<()> {
        let field = self.require_field_mut(id)?;
        field.is_chain_head = is_head;
        field.touch();
        self.rebuild_chains();
        Ok(())
    }

    /// Removes `id` from every `depends_on` list, returning the fields that
    /// referenced it.
    fn purge_dependency(&mut self, id: &FieldId) -> Vec<FieldId> {
        let mut purged = Vec::new();
        for field in self.sections.iter_mut().flat_map(|s| s.fields.iter_mut()) {
            let before = field.depends_on.len();
            field.depends_on.retain(|dep| dep != id);
            if field.depends_on.len() != before {
                purged.push(field.id.clone());
            }
        }
        purged
    }
}

fn check_permutation<T>(field: &str, current: &[T], requested: &[T]) -> Result<()>
where
    T: Eq + std::hash::Hash + std::fmt::Display,
{
    if current.len() != requested.len() {
        return Err(OrchestratorError::validation(field).with_reason(format!(
            "expected {} ids, got {}",
            current.len(),
            requested.len()
        )));
    }
    let known: HashSet<&T> = current.iter().collect();
    let mut seen = HashSet::new();
    for id in requested {
        if !known.contains(id) {
            return Err(OrchestratorError::validation(field).with_reason(format!("unknown id '{id}'")));
        }
        if !seen.insert(id) {
            return Err(OrchestratorError::validation(field).with_reason(format!("duplicate id '{id}'")));
        }
    }
    Ok(())
}
