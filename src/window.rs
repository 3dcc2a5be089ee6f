//! Desktop adapters over the shared simulation: keyboard play and watching a
//! trained table play. Both draw through [`Canvas`] and step on a timer.

use crate::config::{GridConfig, RewardConfig};
use crate::draw::{Canvas, Layout};
use crate::env::{Environment, FrameSink};
use crate::error::EnvError;
use crate::game::Direction;
use crate::trainer::Evaluation;
use anyhow::{Result, anyhow};
use pixels::{Pixels, SurfaceTexture};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::time::{Duration, Instant};
use tracing::{error, info};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

const BASE_TICK_MS: i32 = 150;

/// Keyboard-driven game. Never starves; only walls and the body end it.
pub struct PlaySession {
    env: Environment,
    pending: Option<Direction>,
    paused: bool,
    speed_delta_ms: i32,
    history: Vec<u32>,
}

impl PlaySession {
    pub fn new(grid: GridConfig, rewards: RewardConfig) -> Result<Self, EnvError> {
        let rewards = RewardConfig { starvation_limit: None, ..rewards };
        Ok(Self {
            env: Environment::new(grid, rewards, SmallRng::from_entropy())?,
            pending: None,
            paused: false,
            speed_delta_ms: 0,
            history: Vec::new(),
        })
    }

    fn tick(&mut self) -> Result<(), EnvError> {
        if self.paused || self.env.is_done() {
            return Ok(());
        }
        let wanted = self.pending.take().unwrap_or(self.env.game().dir);
        let step = self.env.steer(wanted)?;
        if step.done {
            self.history.push(self.env.score());
            info!(score = self.env.score(), outcome = ?step.outcome, "game over");
        }
        Ok(())
    }

    fn tick_duration(&self) -> Duration {
        let base = BASE_TICK_MS - self.env.score().min(30) as i32 * 4;
        Duration::from_millis((base + self.speed_delta_ms).clamp(30, 500) as u64)
    }
}

pub enum Session {
    Play(PlaySession),
    Watch { eval: Evaluation, tick_ms: u64, paused: bool },
}

impl Session {
    fn title(&self) -> &'static str {
        match self {
            Session::Play(_) => "Snake",
            Session::Watch { .. } => "Snake - Q-learning agent",
        }
    }

    fn handle_keys(&mut self, input: &WinitInputHelper) -> Result<(), EnvError> {
        let faster = input.key_pressed(VirtualKeyCode::NumpadAdd) || input.key_pressed(VirtualKeyCode::Equals);
        let slower = input.key_pressed(VirtualKeyCode::NumpadSubtract) || input.key_pressed(VirtualKeyCode::Minus);
        let pause = input.key_pressed(VirtualKeyCode::P);

        match self {
            Session::Play(play) => {
                if pause {
                    play.paused = !play.paused;
                }
                if faster {
                    play.speed_delta_ms = (play.speed_delta_ms - 10).max(-150);
                }
                if slower {
                    play.speed_delta_ms = (play.speed_delta_ms + 10).min(300);
                }
                if input.key_pressed(VirtualKeyCode::R) && play.env.is_done() {
                    play.env.reset()?;
                    play.pending = None;
                }
                let keys = [
                    (VirtualKeyCode::Up, VirtualKeyCode::W, Direction::Up),
                    (VirtualKeyCode::Down, VirtualKeyCode::S, Direction::Down),
                    (VirtualKeyCode::Left, VirtualKeyCode::A, Direction::Left),
                    (VirtualKeyCode::Right, VirtualKeyCode::D, Direction::Right),
                ];
                for (arrow, letter, dir) in keys {
                    if input.key_pressed(arrow) || input.key_pressed(letter) {
                        play.pending = Some(dir);
                    }
                }
            }
            Session::Watch { tick_ms, paused, .. } => {
                if pause {
                    *paused = !*paused;
                }
                if faster {
                    *tick_ms = (*tick_ms / 2).max(1);
                }
                if slower {
                    *tick_ms = (*tick_ms * 2).min(1000);
                }
            }
        }
        Ok(())
    }

    fn tick(&mut self) -> Result<(), EnvError> {
        match self {
            Session::Play(play) => play.tick(),
            Session::Watch { eval, paused: false, .. } => eval.tick().map(|_| ()),
            Session::Watch { .. } => Ok(()),
        }
    }

    fn tick_duration(&self) -> Duration {
        match self {
            Session::Play(play) => play.tick_duration(),
            Session::Watch { tick_ms, .. } => Duration::from_millis(*tick_ms),
        }
    }

    fn draw(&self, canvas: &mut Canvas<'_>) {
        let layout = canvas.layout();
        let board_h = layout.rows * layout.cell;
        let chart = (8, board_h + 32, layout.width().saturating_sub(16), layout.hud.saturating_sub(40));

        match self {
            Session::Play(play) => {
                canvas.show(&play.env.frame());
                if play.paused {
                    canvas.banner("PAUSED", board_h / 2, (255, 255, 100, 255));
                } else if play.env.is_done() {
                    canvas.banner("PRESS R TO RESTART", board_h / 2 + 20, (200, 200, 200, 255));
                }
                canvas.chart(chart.0, chart.1, chart.2, chart.3, &play.history);
            }
            Session::Watch { eval, paused, .. } => {
                canvas.show(&eval.frame());
                let done = eval.scores().len();
                if eval.is_finished() {
                    canvas.banner(&format!("DONE: BEST {}", eval.scores().iter().max().unwrap_or(&0)), board_h / 2 + 20, (200, 220, 255, 255));
                } else if *paused {
                    canvas.banner("PAUSED", board_h / 2, (255, 255, 100, 255));
                } else {
                    canvas.text(&format!("EPISODE {}", done + 1), 8, 8, 2, (220, 200, 240, 255));
                }
                canvas.chart(chart.0, chart.1, chart.2, chart.3, eval.scores());
            }
        }
    }
}

/// Opens a window sized to the grid and runs `session` until Esc or close.
pub fn run(mut session: Session, grid: GridConfig, cell: u32) -> Result<()> {
    let layout = Layout::new(grid.width as u32, grid.height as u32, cell);
    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();

    let window = WindowBuilder::new()
        .with_title(session.title())
        .with_inner_size(LogicalSize::new(layout.width(), layout.height()))
        .with_resizable(false)
        .build(&event_loop)
        .map_err(|e| anyhow!("failed to open window: {e}"))?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(layout.width(), layout.height(), surface_texture)
            .map_err(|e| anyhow!("failed to create pixel surface: {e}"))?
    };

    let mut last_update = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            session.draw(&mut Canvas::new(pixels.frame_mut(), layout));
            if let Err(err) = pixels.render() {
                error!(%err, "render failed");
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape) || input.close_requested() || input.destroyed() {
                *control_flow = ControlFlow::Exit;
                return;
            }

            let stepped = session.handle_keys(&input).and_then(|()| {
                if last_update.elapsed() >= session.tick_duration() {
                    last_update = Instant::now();
                    session.tick()
                } else {
                    Ok(())
                }
            });
            if let Err(err) = stepped {
                error!(%err, "simulation stopped");
                *control_flow = ControlFlow::Exit;
                return;
            }

            window.request_redraw();
        }
    });
}
