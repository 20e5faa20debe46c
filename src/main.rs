// main.rs — 原生查看器：winit 事件循环 -> Viewer 输入入口 -> wgpu 渲染

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod renderer;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use pano360::panorama::decode_file;
use pano360::{KeyAction, Panorama, Preferences, ProjectionMode, Viewer, ViewerConfig};
use renderer::Renderer;
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

#[derive(Debug, Parser)]
#[command(name = "pano360", version, about = "360° equirectangular panorama viewer")]
struct Args {
    /// Equirectangular image to open
    #[arg(value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initial projection: gnomonic | stereographic
    #[arg(short, long, value_name = "MODE")]
    projection: Option<ProjectionMode>,

    /// Enable auto-rotation at the given rate (degrees per second)
    #[arg(long, value_name = "DEG_PER_SEC")]
    auto_rotate: Option<f32>,

    /// Render one frame on the CPU to this PNG and exit (needs IMAGE)
    #[arg(long, value_name = "PNG")]
    snapshot: Option<PathBuf>,

    /// Snapshot size
    #[arg(long, default_value_t = 1920)]
    width: u32,
    #[arg(long, default_value_t = 1080)]
    height: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ViewerConfig::load_or_default(path),
        None => ViewerConfig::default(),
    };
    if let Some(rate) = args.auto_rotate {
        config.view_rotation.auto_rotate = true;
        config.view_rotation.auto_rotation_rate = rate;
    }

    if let Some(out) = &args.snapshot {
        return snapshot(config, &args, out);
    }

    run_window(config, args)
}

/// 无窗口：CPU 渲染一帧写入 PNG
fn snapshot(config: ViewerConfig, args: &Args, out: &Path) -> Result<()> {
    let image = args
        .image
        .as_deref()
        .context("--snapshot needs an input image")?;

    let mut viewer = Viewer::new(config);
    if let Some(mode) = args.projection {
        viewer.set_projection_mode(mode);
    }
    viewer.on_resize_pixels(args.width, args.height);
    viewer
        .load_panorama(image)
        .with_context(|| format!("loading {}", image.display()))?;

    // 直接落到初始状态，不做平滑过渡
    let frame = viewer.render_cpu(args.width, args.height);
    frame
        .save(out)
        .with_context(|| format!("writing {}", out.display()))?;
    log::info!("Snapshot written to {}", out.display());
    Ok(())
}

fn run_window(config: ViewerConfig, args: Args) -> Result<()> {
    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("pano360")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let mut viewer = Viewer::new(config).with_preferences(Preferences::default_location());
    if let Some(mode) = args.projection {
        viewer.set_projection_mode(mode);
    }
    let size = window.inner_size();
    viewer.on_resize_pixels(size.width, size.height);

    let mut renderer = pollster::block_on(Renderer::new(window.clone(), &viewer.get_frame_uniforms()))?;
    viewer.set_max_texture_dimension(renderer.max_texture_dimension());

    // 交互状态
    let mut cursor = Vec2::ZERO;
    let mut cursor_inside = false;
    let mut touches: BTreeMap<u64, Vec2> = BTreeMap::new();
    let mut is_fullscreen = false;

    // 异步加载通道
    let (tx, rx): (Sender<Panorama>, Receiver<Panorama>) = channel();
    if let Some(path) = args.image {
        start_load_image(path, viewer.max_texture_dimension(), tx.clone());
    }

    event_loop.run(move |event, _, control_flow| {
        // 暂停时不再持续调度帧
        *control_flow = if viewer.is_running() {
            ControlFlow::Poll
        } else {
            ControlFlow::Wait
        };

        // 检查是否有新加载的图片
        if let Ok(panorama) = rx.try_recv() {
            renderer.load_panorama(&panorama);
            viewer.set_panorama(panorama);
        }

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    viewer.destroy();
                    *control_flow = ControlFlow::Exit;
                }

                WindowEvent::Resized(new_size) => {
                    renderer.resize(new_size);
                    viewer.on_resize_pixels(new_size.width, new_size.height);
                }

                WindowEvent::Focused(focused) => {
                    if focused {
                        viewer.on_focus();
                    } else {
                        viewer.on_blur();
                    }
                }

                WindowEvent::Occluded(occluded) => viewer.on_visibility_change(!occluded),

                WindowEvent::KeyboardInput { input, .. } => {
                    let Some(key) = input.virtual_keycode else {
                        return;
                    };
                    let pressed = input.state == ElementState::Pressed;

                    if let Some(action) = key_action(key) {
                        if pressed {
                            viewer.on_key_action_down(action);
                        } else {
                            viewer.on_key_action_up(action);
                        }
                        return;
                    }

                    if !pressed {
                        return;
                    }
                    match key {
                        VirtualKeyCode::P => {
                            viewer.toggle_projection_mode();
                            window.set_title(&format!("pano360 - {}", viewer.projection_mode().name()));
                        }
                        VirtualKeyCode::O => {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "webp"])
                                .pick_file()
                            {
                                start_load_image(path, viewer.max_texture_dimension(), tx.clone());
                            }
                        }
                        VirtualKeyCode::F11 => {
                            is_fullscreen = !is_fullscreen;
                            if is_fullscreen {
                                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                            } else {
                                window.set_fullscreen(None);
                            }
                        }
                        _ => {}
                    }
                }

                // 鼠标交互
                WindowEvent::CursorEntered { .. } => cursor_inside = true,
                WindowEvent::CursorLeft { .. } => cursor_inside = false,

                WindowEvent::MouseInput { state, button, .. } => {
                    if button == MouseButton::Left {
                        match state {
                            ElementState::Pressed => viewer.on_pointer_down(cursor.x, cursor.y),
                            ElementState::Released => viewer.on_pointer_up(),
                        }
                    }
                }

                WindowEvent::CursorMoved { position, .. } => {
                    cursor = Vec2::new(position.x as f32, position.y as f32);
                    viewer.on_pointer_move(cursor.x, cursor.y);
                }

                WindowEvent::MouseWheel { delta, .. } => {
                    // 与 DOM 的 deltaY 同号：向上滚为负
                    let delta_y = match delta {
                        MouseScrollDelta::LineDelta(_, y) => -y,
                        MouseScrollDelta::PixelDelta(pos) => -(pos.y as f32),
                    };
                    // 纯横向滚动的 y 为 0，不当作缩小
                    if delta_y != 0.0 {
                        viewer.on_wheel(delta_y, cursor_inside);
                    }
                }

                WindowEvent::Touch(touch) => {
                    let location = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                    match touch.phase {
                        TouchPhase::Started => {
                            touches.insert(touch.id, location);
                            viewer.on_touch_start(&touch_list(&touches));
                        }
                        TouchPhase::Moved => {
                            touches.insert(touch.id, location);
                            viewer.on_touch_move(&touch_list(&touches));
                        }
                        TouchPhase::Ended | TouchPhase::Cancelled => {
                            touches.remove(&touch.id);
                            viewer.on_touch_end(&touch_list(&touches));
                        }
                    }
                }

                WindowEvent::DroppedFile(path) => {
                    start_load_image(path, viewer.max_texture_dimension(), tx.clone());
                }

                _ => {}
            },

            Event::RedrawRequested(_) => {
                let Some(uniforms) = viewer.tick() else {
                    return;
                };
                renderer.update_uniforms(&uniforms);

                match renderer.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory, exiting");
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => log::warn!("Render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                if viewer.is_running() {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    });
}

fn key_action(key: VirtualKeyCode) -> Option<KeyAction> {
    match key {
        VirtualKeyCode::Left | VirtualKeyCode::A => Some(KeyAction::PanLeft),
        VirtualKeyCode::Right | VirtualKeyCode::D => Some(KeyAction::PanRight),
        VirtualKeyCode::Up | VirtualKeyCode::W => Some(KeyAction::PanUp),
        VirtualKeyCode::Down | VirtualKeyCode::S => Some(KeyAction::PanDown),
        VirtualKeyCode::Equals | VirtualKeyCode::Plus | VirtualKeyCode::NumpadAdd => Some(KeyAction::ZoomIn),
        VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract => Some(KeyAction::ZoomOut),
        VirtualKeyCode::R => Some(KeyAction::Reset),
        _ => None,
    }
}

fn touch_list(touches: &BTreeMap<u64, Vec2>) -> Vec<Vec2> {
    touches.values().copied().collect()
}

/// 后台线程解码并规整，完成后通过通道交给主线程
fn start_load_image(path: PathBuf, max_dimension: u32, tx: Sender<Panorama>) {
    thread::spawn(move || {
        log::info!("Loading {} in background", path.display());
        match decode_file(&path) {
            Ok(image) => {
                let panorama = Panorama::new(image, max_dimension);
                if tx.send(panorama).is_err() {
                    log::error!("Event loop closed before the panorama arrived");
                }
            }
            Err(e) => log::error!("Failed to load {}: {e}", path.display()),
        }
    });
}
