use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::{config::Layout, sequence::SequenceBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    Shuffling,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub column_width: f32,
    pub column_height_step: f32,
    pub spacing: f32,
    pub canvas_height: f32,
}

impl Geometry {
    fn compute(width: f32, height: f32, columns: usize, layout: Layout) -> Self {
        if columns == 0 {
            return Self {
                column_width: 0.0,
                column_height_step: 0.0,
                spacing: layout.spacing,
                canvas_height: height,
            };
        }
        let columns = columns as f32;
        Self {
            column_width: width / columns / layout.spacing,
            column_height_step: (layout.spacing * (height - layout.y_padding) / columns).max(0.0),
            spacing: layout.spacing,
            canvas_height: height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub sequence: &'a [u32],
    pub geometry: Geometry,
}

impl Frame<'_> {
    pub fn bars(&self) -> impl Iterator<Item = Bar> + '_ {
        let geometry = self.geometry;
        self.sequence.iter().enumerate().map(move |(index, value)| {
            let height = *value as f32 * geometry.column_height_step;
            Bar {
                x: geometry.spacing * index as f32 * geometry.column_width,
                y: geometry.canvas_height - height,
                width: geometry.column_width,
                height,
            }
        })
    }
}

pub struct AnimationEngine {
    buffer: SequenceBuffer,
    mode: AnimationMode,
    layout: Layout,
    canvas: Option<(f32, f32)>,
    geometry: Option<Geometry>,
    rng: StdRng,
    stopped: bool,
    dirty: bool,
}

impl AnimationEngine {
    pub fn new(sequence_length: usize, layout: Layout) -> Self {
        Self::with_rng(sequence_length, layout, StdRng::from_os_rng())
    }

    pub fn with_rng(sequence_length: usize, layout: Layout, rng: StdRng) -> Self {
        Self {
            buffer: SequenceBuffer::new(sequence_length),
            mode: AnimationMode::Settled,
            layout,
            canvas: None,
            geometry: None,
            rng,
            stopped: false,
            dirty: true,
        }
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_ready(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn set_mode(&mut self, mode: AnimationMode) {
        if self.stopped || self.mode == mode {
            return;
        }
        if mode == AnimationMode::Settled {
            self.buffer.sort_ascending();
        }
        debug!(?mode, "animation: mode changed");
        self.mode = mode;
        self.dirty = true;
    }

    pub fn on_frame(&mut self) -> bool {
        if !self.is_ready() {
            return false;
        }
        if self.mode == AnimationMode::Shuffling && !self.stopped {
            self.buffer.randomize_with(&mut self.rng);
        }
        self.dirty = false;
        true
    }

    pub fn wants_frame(&self) -> bool {
        self.is_ready() && (self.dirty || (self.mode == AnimationMode::Shuffling && !self.stopped))
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.canvas = Some((width, height));
        self.geometry = Some(Geometry::compute(
            width,
            height,
            self.buffer.len(),
            self.layout,
        ));
        self.dirty = true;
    }

    pub fn sequence_length(&self) -> usize {
        self.buffer.len()
    }

    pub fn set_sequence_length(&mut self, len: usize) {
        if self.stopped || self.buffer.len() == len {
            return;
        }
        debug!(from = self.buffer.len(), to = len, "animation: sequence resized");
        self.buffer = SequenceBuffer::new(len);
        if let Some((width, height)) = self.canvas {
            self.resize(width, height);
        }
        self.dirty = true;
    }

    pub fn current_frame(&self) -> Option<Frame<'_>> {
        self.geometry.map(|geometry| Frame {
            sequence: self.buffer.as_slice(),
            geometry,
        })
    }

    pub fn stop(&mut self) {
        if !self.stopped {
            debug!("animation: stopped");
            self.stopped = true;
        }
    }
}

#[derive(Clone)]
pub struct AnimationHandle {
    inner: Arc<Mutex<AnimationEngine>>,
}

impl AnimationHandle {
    pub fn new(engine: AnimationEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn engine(&self) -> MutexGuard<'_, AnimationEngine> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_mode(&self, mode: AnimationMode) {
        self.engine().set_mode(mode);
    }

    pub fn mode(&self) -> AnimationMode {
        self.engine().mode()
    }

    pub fn on_frame(&self) -> bool {
        self.engine().on_frame()
    }

    pub fn wants_frame(&self) -> bool {
        self.engine().wants_frame()
    }

    pub fn resize(&self, width: f32, height: f32) {
        self.engine().resize(width, height);
    }

    pub fn sequence_length(&self) -> usize {
        self.engine().sequence_length()
    }

    pub fn set_sequence_length(&self, len: usize) {
        self.engine().set_sequence_length(len);
    }

    pub fn stop(&self) {
        self.engine().stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.engine().is_stopped()
    }

    pub fn draw_with<R>(&self, draw: impl FnOnce(Frame<'_>) -> R) -> Option<R> {
        let engine = self.engine();
        engine.current_frame().map(draw)
    }

    pub fn sequence(&self) -> Vec<u32> {
        self.engine().buffer.as_slice().to_vec()
    }
}
