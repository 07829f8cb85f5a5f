//! Message router: the single owner of role bindings and dedup state.
//!
//! Every transport event is funnelled through [`Router::handle`] by one
//! dispatcher, so role assignment, stroke translation and disconnect
//! handling never interleave.
//!
//! A drawing batch is translated point by point. When a peer's send queue
//! is full the batch pauses and [`Router::handle`] returns
//! [`DrawProgress::Pending`]; the dispatcher calls [`Router::resume`] once the
//! transport has drained, before feeding the next event.

use std::collections::HashMap;
use std::sync::Arc;

use inkbridge_core::{
    glyphs, ConnectionId, Inbound, JointCommand, Outbound, Point, Role, Stroke, SystemNotice,
    TextRequest, Translator,
};
use serde::Serialize;

use crate::config::{BindingPolicy, RelayConfig};
use crate::emitter::CommandEmitter;
use crate::outbox::Outbox;
use crate::registry::RoleRegistry;
use crate::stroke_log::StrokeLog;

/// Transport-level happenings fed to the router.
#[derive(Clone, Debug, PartialEq)]
pub enum RelayEvent {
    Connected(ConnectionId),
    Frame(ConnectionId, String),
    Disconnected(ConnectionId),
}

/// Identification state of one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerState {
    Unidentified,
    Identified(Role),
}

impl PeerState {
    fn role(self) -> Option<Role> {
        match self {
            Self::Unidentified => None,
            Self::Identified(role) => Some(role),
        }
    }
}

/// Whether a drawing batch is still in flight after a router call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawProgress {
    Done,
    /// Waiting for send-queue room; `remaining` counts the outstanding steps
    /// (points plus the final pen-up).
    Pending { remaining: usize },
}

/// A batch being translated. `cursor == points.len()` is the pen-up step.
struct DrawJob {
    operator: ConnectionId,
    strokes: Vec<Stroke>,
    points: Vec<Point>,
    cursor: usize,
}

impl DrawJob {
    fn new(operator: ConnectionId, strokes: Vec<Stroke>) -> Self {
        let points = strokes
            .iter()
            .flat_map(|stroke| stroke.points().iter().copied())
            .collect();
        Self {
            operator,
            strokes,
            points,
            cursor: 0,
        }
    }

    fn remaining(&self) -> usize {
        (self.points.len() + 1).saturating_sub(self.cursor)
    }
}

/// Point-in-time view of the relay, served by the health endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RelayStatus {
    pub connections: usize,
    pub operator_bound: bool,
    pub arm_bound: bool,
    pub strokes_logged: usize,
    pub frames_received: u64,
    pub commands_sent: u64,
    pub commands_suppressed: u64,
}

pub struct Router {
    policy: BindingPolicy,
    angle_decimals: u32,
    translator: Translator,
    registry: RoleRegistry,
    emitter: CommandEmitter,
    peers: HashMap<ConnectionId, PeerState>,
    strokes: StrokeLog,
    frames_received: u64,
    drawing: Option<DrawJob>,
}

impl Router {
    pub fn new(config: &RelayConfig, outbox: Arc<dyn Outbox>) -> Self {
        Self {
            policy: config.binding_policy,
            angle_decimals: config.angle_decimals,
            translator: Translator::new(config.geometry),
            registry: RoleRegistry::new(),
            emitter: CommandEmitter::new(outbox),
            peers: HashMap::new(),
            strokes: StrokeLog::new(config.stroke_log_capacity),
            frames_received: 0,
            drawing: None,
        }
    }

    /// Apply one transport event.
    ///
    /// A batch left pending by an earlier call is pushed through first, even
    /// into full queues, so events are never reordered.
    pub fn handle(&mut self, event: RelayEvent) -> DrawProgress {
        while self.drawing.is_some() {
            self.advance(true);
        }
        match event {
            RelayEvent::Connected(id) => self.on_connect(id),
            RelayEvent::Frame(id, text) => self.on_frame(&id, &text),
            RelayEvent::Disconnected(id) => self.on_disconnect(&id),
        }
        self.progress()
    }

    /// Continue a paused batch as far as send-queue room allows.
    pub fn resume(&mut self) -> DrawProgress {
        self.advance(false);
        self.progress()
    }

    /// Take one step of a paused batch regardless of queue room. A peer whose
    /// queue is still full fails the send and is dropped.
    pub fn force_step(&mut self) -> DrawProgress {
        self.advance_one();
        self.progress()
    }

    fn progress(&self) -> DrawProgress {
        match &self.drawing {
            None => DrawProgress::Done,
            Some(job) => DrawProgress::Pending {
                remaining: job.remaining(),
            },
        }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn strokes(&self) -> &StrokeLog {
        &self.strokes
    }

    pub fn peer_state(&self, id: &ConnectionId) -> Option<PeerState> {
        self.peers.get(id).copied()
    }

    pub fn status(&self) -> RelayStatus {
        let stats = self.emitter.stats();
        RelayStatus {
            connections: self.peers.len(),
            operator_bound: self.registry.is_bound(Role::Operator),
            arm_bound: self.registry.is_bound(Role::Arm),
            strokes_logged: self.strokes.len(),
            frames_received: self.frames_received,
            commands_sent: stats.sent,
            commands_suppressed: stats.suppressed,
        }
    }

    fn on_connect(&mut self, id: ConnectionId) {
        tracing::debug!(connection_id = %id, "peer connected");
        self.peers.insert(id, PeerState::Unidentified);
    }

    fn on_disconnect(&mut self, id: &ConnectionId) {
        tracing::debug!(connection_id = %id, "peer disconnected");
        self.release(id);
    }

    fn on_frame(&mut self, id: &ConnectionId, text: &str) {
        let Some(state) = self.peer_state(id) else {
            tracing::debug!(connection_id = %id, "frame from released connection ignored");
            return;
        };
        self.frames_received += 1;

        let message = match inkbridge_core::wire::decode(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(connection_id = %id, kind = e.error_kind(), error = %e, "undecodable frame");
                self.reply_error(id, format!("Invalid message: {e}"));
                return;
            }
        };
        tracing::trace!(connection_id = %id, kind = message.kind(), "frame decoded");

        match message {
            Inbound::Unknown(kind) => {
                tracing::warn!(connection_id = %id, kind = %kind, "unknown message id");
                self.reply_error(id, format!("Unknown message id: {kind}"));
            }
            Inbound::Identify(role) => self.on_identify(id, state, role),
            Inbound::Drawing(strokes) => {
                if self.ensure_operator(id, state, "DRAWING") {
                    self.start_drawing(id, strokes);
                }
            }
            Inbound::Text(request) => {
                if self.ensure_operator(id, state, "TEXT") {
                    let strokes = self.lay_out(&request);
                    tracing::info!(connection_id = %id, chars = request.text.chars().count(), "writing text");
                    self.start_drawing(id, strokes);
                }
            }
            Inbound::Clear => {
                if self.ensure_operator(id, state, "CLEAR") {
                    self.strokes.clear();
                    tracing::info!(connection_id = %id, "canvas cleared");
                    self.deliver(id, Outbound::Notice(SystemNotice::canvas_cleared()));
                }
            }
        }
    }

    fn on_identify(&mut self, id: &ConnectionId, state: PeerState, role: Role) {
        match state.role() {
            None => {
                self.identify(id, role);
            }
            Some(current) if current == role => {
                if !self.registry.holds(role, id) {
                    self.reply_error(id, format!("This {role} connection was replaced"));
                }
            }
            Some(current) => {
                self.reply_error(id, format!("Connection is already identified as {current}"));
            }
        }
    }

    /// Whether `id` may act as the operator, identifying it first if needed.
    fn ensure_operator(&mut self, id: &ConnectionId, state: PeerState, kind: &str) -> bool {
        match state.role() {
            // Identification can fail to reach the new operator, which releases it.
            None => self.identify(id, Role::Operator) && self.registry.holds(Role::Operator, id),
            Some(Role::Operator) if self.registry.holds(Role::Operator, id) => true,
            Some(Role::Operator) => {
                self.reply_error(id, "This operator connection was replaced");
                false
            }
            Some(Role::Arm) => {
                self.reply_error(id, format!("{kind} is only accepted from the operator"));
                false
            }
        }
    }

    /// Bind `id` to `role` according to the binding policy.
    fn identify(&mut self, id: &ConnectionId, role: Role) -> bool {
        let occupied = self
            .registry
            .lookup(role)
            .is_some_and(|holder| holder != id);
        if occupied && self.policy == BindingPolicy::RejectSecond {
            tracing::info!(connection_id = %id, role = %role, "role already bound, rejecting");
            self.reply_error(id, format!("An {role} is already connected"));
            return false;
        }

        let evicted = self.registry.bind(role, id.clone());
        self.peers.insert(id.clone(), PeerState::Identified(role));
        tracing::info!(connection_id = %id, role = %role, "peer identified");

        if let Some(previous) = evicted {
            tracing::info!(connection_id = %previous, role = %role, "previous holder evicted");
            self.emitter.forget(&previous);
            self.reply_error(&previous, format!("Replaced by a newer {role} connection"));
        }

        match role {
            Role::Arm => {
                if let Some(operator) = self.registry.lookup(Role::Operator).cloned() {
                    self.deliver(&operator, Outbound::Notice(SystemNotice::arm_connected()));
                }
            }
            Role::Operator => {
                self.deliver(id, Outbound::Notice(SystemNotice::client_connected()));
                if self.registry.is_bound(Role::Arm) && self.registry.holds(Role::Operator, id) {
                    self.deliver(id, Outbound::Notice(SystemNotice::arm_connected()));
                }
            }
        }
        true
    }

    /// Pen start for text without an explicit origin: the tip of the first
    /// link in its rest pose.
    fn lay_out(&self, request: &TextRequest) -> Vec<Stroke> {
        let origin = request.origin.unwrap_or_else(|| {
            let link1 = self.translator.geometry().link1();
            Point::new(link1.x, link1.y)
        });
        glyphs::layout(&request.text, origin, request.scale)
    }

    fn start_drawing(&mut self, operator: &ConnectionId, strokes: Vec<Stroke>) {
        self.drawing = Some(DrawJob::new(operator.clone(), strokes));
        self.advance(false);
    }

    /// Run the current batch until it finishes or, unless `force`, a peer
    /// has no queue room for the next step.
    fn advance(&mut self, force: bool) {
        while let Some(job) = &self.drawing {
            if !force && !self.has_room_for(job) {
                return;
            }
            self.advance_one();
        }
    }

    /// Whether every peer the next step writes to can take a frame.
    fn has_room_for(&self, job: &DrawJob) -> bool {
        let arm_ok = self
            .registry
            .lookup(Role::Arm)
            .map_or(true, |arm| self.emitter.has_room(arm));
        let echoes = job.cursor < job.points.len()
            && self.registry.holds(Role::Operator, &job.operator);
        arm_ok && (!echoes || self.emitter.has_room(&job.operator))
    }

    /// One move (with its echo) or the closing pen-up.
    fn advance_one(&mut self) {
        let Some(mut job) = self.drawing.take() else {
            return;
        };

        match job.points.get(job.cursor).copied() {
            Some(point) => {
                let angles = self.translator.translate(point).rounded(self.angle_decimals);
                if let Some(arm) = self.registry.lookup(Role::Arm).cloned() {
                    self.deliver(&arm, Outbound::Command(JointCommand::Move(angles)));
                }
                if self.registry.holds(Role::Operator, &job.operator) {
                    self.deliver(&job.operator, Outbound::Echo { point, angles });
                }
            }
            None if !job.points.is_empty() => {
                if let Some(arm) = self.registry.lookup(Role::Arm).cloned() {
                    self.deliver(&arm, Outbound::Command(JointCommand::PenUp));
                }
            }
            None => {}
        }
        job.cursor += 1;

        if job.cursor <= job.points.len() {
            self.drawing = Some(job);
            return;
        }
        tracing::debug!(
            connection_id = %job.operator,
            strokes = job.strokes.len(),
            points = job.points.len(),
            arm_bound = self.registry.is_bound(Role::Arm),
            "drawing batch translated"
        );
        self.strokes.extend(job.strokes);
    }

    fn reply_error(&mut self, to: &ConnectionId, message: impl Into<String>) {
        self.deliver(to, Outbound::Notice(SystemNotice::error(message)));
    }

    /// Emit to a peer; a failed send counts as that peer disconnecting.
    fn deliver(&mut self, to: &ConnectionId, message: Outbound) {
        if let Err(e) = self.emitter.emit(to, &message) {
            tracing::warn!(connection_id = %to, error = %e, "send failed, dropping peer");
            self.emitter.close(to);
            self.release(to);
        }
    }

    /// Forget a connection and tell the operator if the arm went away.
    fn release(&mut self, id: &ConnectionId) {
        self.peers.remove(id);
        self.emitter.forget(id);

        let Some(role) = self.registry.unbind(id) else {
            return;
        };
        tracing::info!(connection_id = %id, role = %role, "role released");

        if role == Role::Arm {
            if let Some(operator) = self.registry.lookup(Role::Operator).cloned() {
                self.deliver(&operator, Outbound::Notice(SystemNotice::arm_disconnected()));
            }
        }
    }
}
