//! The message hub
//!
//! [`Core`] owns every component, records which component provides, depends on
//! or accepts each [`Capability`], and routes messages between them. It also
//! drives the run: dependency ordering, spinup, the annual loop, reset and
//! shut down.
//!
//! Components are stored in `RefCell`s so that a running component can query
//! others through a shared `&Core`. A component that queries itself while it
//! is being mutated gets [`NboxError::ReentrantMessage`] rather than a panic.

use crate::capability::Capability;
use crate::component::Component;
use crate::errors::{NboxError, NboxResult};
use crate::message::{Message, MessageData};
use crate::timeseries::Time;
use crate::units::UnitVal;
use log::{debug, info, warn};
use petgraph::graph::NodeIndex;
use petgraph::{Direction, Graph};
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

pub type ComponentId = usize;

const LOG_TARGET: &str = "core";

/// Run-level settings of the hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// First date of the simulation; the first solved year is `start_date + 1`
    pub start_date: Time,
    /// Last date of the simulation
    pub end_date: Time,
    /// Drive the model to equilibrium before the scenario starts
    pub do_spinup: bool,
    /// Spinup steps allowed before giving up
    pub max_spinup_steps: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            start_date: 1745.0,
            end_date: 2300.0,
            do_spinup: true,
            max_spinup_steps: 2000,
        }
    }
}

/// Capability bookkeeping filled in by [`Component::init`]
#[derive(Debug, Default)]
pub struct Registry {
    current: ComponentId,
    names: Vec<String>,
    capabilities: BTreeMap<Capability, ComponentId>,
    inputs: BTreeMap<Capability, ComponentId>,
    dependencies: Vec<(ComponentId, Capability)>,
}

impl Registry {
    /// Declare that the component being initialised answers GETDATA for `capability`
    pub fn register_capability(&mut self, capability: Capability) -> NboxResult<()> {
        if let Some(existing) = self.capabilities.get(&capability) {
            return Err(NboxError::CapabilityConflict {
                capability: capability.name(),
                existing: self.names[*existing].clone(),
            });
        }
        self.capabilities.insert(capability, self.current);
        Ok(())
    }

    /// Declare that the component being initialised reads `capability` while running
    pub fn register_dependency(&mut self, capability: Capability) {
        self.dependencies.push((self.current, capability));
    }

    /// Declare that the component being initialised accepts SETDATA for `capability`
    pub fn register_input(&mut self, capability: Capability) -> NboxResult<()> {
        if let Some(existing) = self.inputs.get(&capability) {
            return Err(NboxError::CapabilityConflict {
                capability: capability.name(),
                existing: self.names[*existing].clone(),
            });
        }
        self.inputs.insert(capability, self.current);
        Ok(())
    }

    pub fn provider(&self, capability: Capability) -> Option<ComponentId> {
        self.capabilities.get(&capability).copied()
    }

    pub fn input_target(&self, capability: Capability) -> Option<ComponentId> {
        self.inputs.get(&capability).copied()
    }
}

pub struct Core {
    config: CoreConfig,
    components: Vec<RefCell<Box<dyn Component>>>,
    registry: Registry,
    run_order: Vec<ComponentId>,
    current_date: Time,
    in_spinup: bool,
    prepared: bool,
    is_shut_down: bool,
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("config", &self.config)
            .field("components", &self.registry.names)
            .field("run_order", &self.run_order)
            .field("current_date", &self.current_date)
            .finish()
    }
}

impl Core {
    pub fn new(config: CoreConfig) -> NboxResult<Self> {
        if config.end_date <= config.start_date {
            return Err(NboxError::date(
                LOG_TARGET,
                format!(
                    "end date {} must be after start date {}",
                    config.end_date, config.start_date
                ),
            ));
        }
        Ok(Self {
            current_date: config.start_date,
            config,
            components: Vec::new(),
            registry: Registry::default(),
            run_order: Vec::new(),
            in_spinup: false,
            prepared: false,
            is_shut_down: false,
        })
    }

    /// Attach a component and let it register its capabilities
    pub fn add_component(&mut self, mut component: Box<dyn Component>) -> NboxResult<ComponentId> {
        if self.prepared {
            return Err(NboxError::contract(
                LOG_TARGET,
                format!("cannot add '{}' after the run was prepared", component.name()),
            ));
        }
        let name = component.name().to_string();
        if self.registry.names.contains(&name) {
            return Err(NboxError::contract(
                LOG_TARGET,
                format!("component '{}' added twice", name),
            ));
        }

        let id = self.components.len();
        self.registry.current = id;
        self.registry.names.push(name.clone());
        component.init(&mut self.registry)?;
        self.components.push(RefCell::new(component));
        info!(target: LOG_TARGET, "added component {} as #{}", name, id);
        Ok(id)
    }

    pub fn start_date(&self) -> Time {
        self.config.start_date
    }

    pub fn end_date(&self) -> Time {
        self.config.end_date
    }

    /// Last date every component has completed
    pub fn current_date(&self) -> Time {
        self.current_date
    }

    pub fn in_spinup(&self) -> bool {
        self.in_spinup
    }

    pub fn check_capability(&self, capability: Capability) -> bool {
        self.registry.provider(capability).is_some()
    }

    /// Identifier of the component providing `capability`
    pub fn component_id(&self, capability: Capability) -> NboxResult<ComponentId> {
        self.registry
            .provider(capability)
            .ok_or_else(|| NboxError::UnknownCapability(capability.name()))
    }

    pub fn component_name(&self, id: ComponentId) -> &str {
        &self.registry.names[id]
    }

    /// Names of the components in the order they run
    pub fn run_order(&self) -> Vec<&str> {
        self.run_order
            .iter()
            .map(|id| self.registry.names[*id].as_str())
            .collect()
    }

    pub fn component(&self, id: ComponentId) -> NboxResult<Ref<'_, Box<dyn Component>>> {
        self.components[id]
            .try_borrow()
            .map_err(|_| NboxError::ReentrantMessage(self.registry.names[id].clone()))
    }

    pub fn component_mut(&self, id: ComponentId) -> NboxResult<RefMut<'_, Box<dyn Component>>> {
        self.components[id]
            .try_borrow_mut()
            .map_err(|_| NboxError::ReentrantMessage(self.registry.names[id].clone()))
    }

    /// Route a message to the component responsible for `capability`
    ///
    /// GETDATA goes to the provider, SETDATA to the registered input target
    /// and any other message to the provider's message handler.
    pub fn send_message(
        &self,
        message: Message,
        capability: Capability,
        data: MessageData,
    ) -> NboxResult<UnitVal> {
        match message {
            Message::GetData => {
                let id = self.component_id(capability)?;
                self.component(id)?.get_data(capability, data.date)
            }
            Message::SetData => {
                let id = self
                    .registry
                    .input_target(capability)
                    .ok_or_else(|| NboxError::UnknownCapability(capability.name()))?;
                self.component_mut(id)?.set_data(capability, data)?;
                Ok(UnitVal::undefined())
            }
            other => {
                let id = self.component_id(capability)?;
                self.component_mut(id)?
                    .handle_message(other, capability, data)
            }
        }
    }

    pub fn get_data(&self, capability: Capability, date: Option<Time>) -> NboxResult<UnitVal> {
        self.send_message(Message::GetData, capability, MessageData::request(date))
    }

    pub fn set_data(&self, capability: Capability, data: MessageData) -> NboxResult<()> {
        self.send_message(Message::SetData, capability, data)
            .map(|_| ())
    }

    /// Order components so that every provider runs before its consumers
    ///
    /// Components with no ordering constraint between them keep the order in
    /// which they were added. Dependencies nobody provides are skipped.
    fn resolve_run_order(&self) -> NboxResult<Vec<ComponentId>> {
        let mut graph: Graph<ComponentId, Capability> = Graph::new();
        let nodes: Vec<NodeIndex> = (0..self.components.len())
            .map(|id| graph.add_node(id))
            .collect();

        for (consumer, capability) in &self.registry.dependencies {
            match self.registry.provider(*capability) {
                Some(provider) if provider != *consumer => {
                    graph.update_edge(nodes[provider], nodes[*consumer], *capability);
                }
                Some(_) => {}
                None => warn!(
                    target: LOG_TARGET,
                    "{} depends on {} but no component provides it",
                    self.registry.names[*consumer],
                    capability
                ),
            }
        }

        let mut in_degree: Vec<usize> = nodes
            .iter()
            .map(|n| graph.neighbors_directed(*n, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<ComponentId>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| Reverse(id))
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for next in graph.neighbors_directed(nodes[id], Direction::Outgoing) {
                let next_id = graph[next];
                in_degree[next_id] -= 1;
                if in_degree[next_id] == 0 {
                    ready.push(Reverse(next_id));
                }
            }
        }

        if order.len() != nodes.len() {
            let stuck = (0..nodes.len())
                .find(|id| !order.contains(id))
                .map(|id| self.registry.names[id].clone())
                .unwrap_or_default();
            return Err(NboxError::DependencyCycle(stuck));
        }
        Ok(order)
    }

    fn for_each_in_order<F>(&self, mut f: F) -> NboxResult<()>
    where
        F: FnMut(&mut dyn Component, &Core) -> NboxResult<()>,
    {
        for &id in &self.run_order {
            let mut component = self.component_mut(id)?;
            f(&mut **component, self)?;
        }
        Ok(())
    }

    /// Resolve the run order, then let each component validate itself
    pub fn prepare_to_run(&mut self) -> NboxResult<()> {
        if self.prepared {
            return Ok(());
        }
        self.run_order = self.resolve_run_order()?;
        info!(target: LOG_TARGET, "run order: {:?}", self.run_order());

        self.for_each_in_order(|component, core| component.prepare_to_run(core))?;
        self.prepared = true;

        if self.config.do_spinup {
            self.run_spinup()?;
        }
        Ok(())
    }

    /// Step every component through spinup until all report convergence
    ///
    /// Returns the number of steps taken.
    pub fn run_spinup(&mut self) -> NboxResult<usize> {
        self.in_spinup = true;
        let result = self.spinup_loop();
        self.in_spinup = false;
        let steps = result?;
        info!(target: LOG_TARGET, "spinup converged after {} steps", steps);
        Ok(steps)
    }

    fn spinup_loop(&self) -> NboxResult<usize> {
        for step in 1..=self.config.max_spinup_steps {
            let mut converged = true;
            for &id in &self.run_order {
                converged &= self.component_mut(id)?.run_spinup(step, self)?;
            }
            if converged {
                return Ok(step);
            }
        }
        Err(NboxError::SpinupNotConverged {
            steps: self.config.max_spinup_steps,
        })
    }

    /// Advance year by year up to `until` (the end date when `None`)
    pub fn run(&mut self, until: Option<Time>) -> NboxResult<()> {
        if self.is_shut_down {
            return Err(NboxError::contract(LOG_TARGET, "core has been shut down"));
        }
        self.prepare_to_run()?;

        let until = until.unwrap_or(self.config.end_date);
        if until > self.config.end_date {
            return Err(NboxError::date(
                LOG_TARGET,
                format!("cannot run to {} past end date {}", until, self.config.end_date),
            ));
        }

        while self.current_date + 1.0 <= until {
            let t = self.current_date + 1.0;
            debug!(target: LOG_TARGET, "running {}", t);
            self.for_each_in_order(|component, core| component.run(t, core))?;
            self.current_date = t;
        }
        Ok(())
    }

    /// Rewind every component to `t`
    pub fn reset(&mut self, t: Time) -> NboxResult<()> {
        if t < self.config.start_date || t > self.current_date {
            return Err(NboxError::date(
                LOG_TARGET,
                format!(
                    "reset date {} outside [{}, {}]",
                    t, self.config.start_date, self.current_date
                ),
            ));
        }
        self.for_each_in_order(|component, _| component.reset(t))?;
        self.current_date = t;
        info!(target: LOG_TARGET, "reset to {}", t);
        Ok(())
    }

    /// Release every component. Safe to call more than once.
    pub fn shut_down(&mut self) {
        if self.is_shut_down {
            return;
        }
        for cell in &self.components {
            match cell.try_borrow_mut() {
                Ok(mut component) => component.shut_down(),
                Err(_) => warn!(target: LOG_TARGET, "component busy during shut down"),
            }
        }
        self.is_shut_down = true;
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        self.shut_down();
    }
}
