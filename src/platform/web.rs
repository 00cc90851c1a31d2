//! Browser bindings: `requestAnimationFrame` and `setInterval` scheduling, a
//! 2D canvas surface,
//! `<img>` texture loading and DOM input listeners

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, EventTarget, HtmlCanvasElement,
    HtmlImageElement, KeyboardEvent, MouseEvent, Window,
};

use super::{FrameRequest, FrameScheduler, TickerHandle};
use crate::error::AssetError;
use crate::game::InputHandler;
use crate::renderer::{BlendMode, DrawList, Surface, TextureData, TextureLoader, TextureSource};
use crate::sprites::{Color, DrawContext, replay};

/// Decoded images by url, shared between the loader and the surface
pub type ImageCache = Rc<RefCell<HashMap<String, HtmlImageElement>>>;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;
type TickCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Scheduler backed by `requestAnimationFrame` for frames and `setInterval`
/// for physics. Callbacks are installed after the game exists, since the
/// game owns the scheduler.
#[derive(Clone)]
pub struct RafScheduler {
    window: Window,
    callback: FrameCallback,
    tick: TickCallback,
}

impl RafScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            callback: Rc::default(),
            tick: Rc::default(),
        }
    }

    /// Install the per-frame callback; it receives the RAF timestamp (ms)
    pub fn set_callback(&self, callback: impl FnMut(f64) + 'static) {
        *self.callback.borrow_mut() = Some(Closure::<dyn FnMut(f64)>::new(callback));
    }

    /// Install the physics tick; it receives the wall clock (ms)
    pub fn set_tick_callback(&self, mut callback: impl FnMut(f64) + 'static) {
        let tick = move || callback(js_sys::Date::now());
        *self.tick.borrow_mut() = Some(Closure::<dyn FnMut()>::new(tick));
    }
}

impl FrameScheduler for RafScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let slot = self.callback.borrow();
        let Some(callback) = slot.as_ref() else {
            log::warn!("Frame requested before a callback was installed");
            return FrameRequest(0);
        };
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(handle) => FrameRequest(handle),
            Err(e) => {
                log::error!("requestAnimationFrame failed: {e:?}");
                FrameRequest(0)
            }
        }
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if request.0 != 0 {
            let _ = self.window.cancel_animation_frame(request.0);
        }
    }

    fn start_ticker(&mut self, interval: f32) -> TickerHandle {
        let slot = self.tick.borrow();
        let Some(tick) = slot.as_ref() else {
            log::warn!("Physics ticker started before a callback was installed");
            return TickerHandle(0);
        };
        let timeout = (interval * 1000.0).round().max(1.0) as i32;
        match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                tick.as_ref().unchecked_ref(),
                timeout,
            ) {
            Ok(handle) => TickerHandle(handle),
            Err(e) => {
                log::error!("setInterval failed: {e:?}");
                TickerHandle(0)
            }
        }
    }

    fn stop_ticker(&mut self, handle: TickerHandle) {
        if handle.0 != 0 {
            self.window.clear_interval_with_handle(handle.0);
        }
    }
}

/// Canvas 2D presentation surface
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    images: ImageCache,
}

impl CanvasSurface {
    /// Create a `width × height` canvas inside `container`
    pub fn new(
        document: &Document,
        container: &Element,
        width: u32,
        height: u32,
        images: ImageCache,
    ) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        canvas.set_width(width);
        canvas.set_height(height);
        container.append_child(&canvas)?;

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d canvas context unavailable"))?
            .dyn_into()?;
        log::info!("Canvas surface created ({width}x{height})");
        Ok(Self {
            canvas,
            ctx,
            images,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn present(&mut self, frame: &DrawList) {
        let ctx = &self.ctx;
        let (w, h) = (self.canvas.width() as f64, self.canvas.height() as f64);
        ctx.set_global_alpha(1.0);
        let _ = ctx.set_global_composite_operation("source-over");
        ctx.set_fill_style_str(&Color::rgb(frame.clear_color).to_css());
        ctx.fill_rect(0.0, 0.0, w, h);

        let images = self.images.borrow();
        let draws = frame.instances.iter().zip(&frame.textures).zip(&frame.blends);
        for ((instance, texture), blend) in draws {
            let (sw, sh) = (instance.size[0] as f64, instance.size[1] as f64);
            let origin_x = -(instance.anchor[0] as f64) * sw;
            let origin_y = -(instance.anchor[1] as f64) * sh;

            ctx.save();
            let _ = ctx.set_global_composite_operation(match blend {
                BlendMode::Add => "lighter",
                BlendMode::Normal => "source-over",
            });
            ctx.set_global_alpha(instance.alpha as f64);
            let _ = ctx.translate(instance.position[0] as f64, instance.position[1] as f64);
            let _ = ctx.rotate(instance.rotation as f64);

            match &texture.source {
                TextureSource::Image { url } => {
                    if let Some(image) = images.get(url) {
                        let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                            image, origin_x, origin_y, sw, sh,
                        );
                    }
                }
                TextureSource::Vector { commands } => {
                    let _ = ctx.translate(origin_x, origin_y);
                    let _ = ctx.scale(
                        sw / texture.width.max(1) as f64,
                        sh / texture.height.max(1) as f64,
                    );
                    let mut canvas = CanvasDrawContext::new(ctx, instance.alpha, instance.tint);
                    replay(commands, &mut canvas);
                }
            }
            ctx.restore();
        }
    }

    fn destroy(&mut self) {
        self.images.borrow_mut().clear();
        self.canvas.remove();
        log::info!("Canvas surface destroyed");
    }
}

/// [`DrawContext`] onto a live canvas. Colours are multiplied by a tint,
/// alpha by the owning sprite's alpha.
pub struct CanvasDrawContext<'a> {
    ctx: &'a CanvasRenderingContext2d,
    alpha: f32,
    tint: [f32; 4],
}

impl<'a> CanvasDrawContext<'a> {
    pub fn new(ctx: &'a CanvasRenderingContext2d, alpha: f32, tint: [f32; 4]) -> Self {
        Self { ctx, alpha, tint }
    }

    fn css(&self, color: Color) -> String {
        let (r, g, b) = color.channels();
        let channel = |c: u8, t: f32| (c as f32 * t).round().clamp(0.0, 255.0) as u32;
        let rgb = (channel(r, self.tint[0]) << 16)
            | (channel(g, self.tint[1]) << 8)
            | channel(b, self.tint[2]);
        Color::rgb(rgb).with_alpha(color.alpha).to_css()
    }
}

impl DrawContext for CanvasDrawContext<'_> {
    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, x: f32, y: f32) {
        let _ = self.ctx.translate(x as f64, y as f64);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ctx.set_global_alpha((self.alpha * alpha) as f64);
    }

    fn set_fill(&mut self, color: Color) {
        self.ctx.set_fill_style_str(&self.css(color));
    }

    fn set_stroke(&mut self, color: Color, width: f32) {
        self.ctx.set_stroke_style_str(&self.css(color));
        self.ctx.set_line_width(width as f64);
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.ctx.move_to(x as f64, y as f64);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.ctx.line_to(x as f64, y as f64);
    }

    fn quadratic_curve_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        self.ctx
            .quadratic_curve_to(cx as f64, cy as f64, x as f64, y as f64);
    }

    fn arc(&mut self, x: f32, y: f32, radius: f32, start: f32, end: f32, counter_clockwise: bool) {
        let _ = self.ctx.arc_with_anticlockwise(
            x as f64,
            y as f64,
            radius as f64,
            start as f64,
            end as f64,
            counter_clockwise,
        );
    }

    fn ellipse(&mut self, x: f32, y: f32, rx: f32, ry: f32) {
        let _ = self.ctx.ellipse(
            x as f64,
            y as f64,
            rx as f64,
            ry as f64,
            0.0,
            0.0,
            std::f64::consts::TAU,
        );
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ctx.rect(x as f64, y as f64, w as f64, h as f64);
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }
}

/// Loads textures through `<img>` elements
#[derive(Clone, Default)]
pub struct ImageTextureLoader {
    images: ImageCache,
}

impl ImageTextureLoader {
    pub fn new(images: ImageCache) -> Self {
        Self { images }
    }
}

impl TextureLoader for ImageTextureLoader {
    async fn load(&self, url: &str) -> Result<TextureData, AssetError> {
        let image = HtmlImageElement::new().map_err(|e| AssetError::Decode {
            url: url.to_owned(),
            reason: format!("{e:?}"),
        })?;
        let loaded = js_sys::Promise::new(&mut |resolve, reject| {
            image.set_onload(Some(&resolve));
            image.set_onerror(Some(&reject));
        });
        image.set_src(url);
        let result = JsFuture::from(loaded).await;
        image.set_onload(None);
        image.set_onerror(None);
        result.map_err(|_| AssetError::NotFound {
            url: url.to_owned(),
        })?;

        let (width, height) = (image.natural_width(), image.natural_height());
        self.images.borrow_mut().insert(url.to_owned(), image);
        log::debug!("Image loaded: {url} ({width}x{height})");
        Ok(TextureData {
            width,
            height,
            source: TextureSource::Image {
                url: url.to_owned(),
            },
        })
    }
}

type Listener = (EventTarget, &'static str, Closure<dyn FnMut(web_sys::Event)>);

/// DOM listeners feeding one player's controls. Dropping the guard
/// unregisters every listener.
pub struct InputListeners {
    listeners: Vec<Listener>,
}

impl InputListeners {
    /// Keys are read from the window, buttons and aim from the canvas
    pub fn attach(
        window: &Window,
        canvas: &HtmlCanvasElement,
        input: InputHandler,
    ) -> Result<Self, JsValue> {
        let mut guard = Self {
            listeners: Vec::new(),
        };
        let window: &EventTarget = window.as_ref();
        let canvas: &EventTarget = canvas.as_ref();

        let handler = input.clone();
        guard.listen(window, "keydown", move |event| {
            if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
                if handler.key_down(&key.key()) {
                    event.prevent_default();
                }
            }
        })?;
        let handler = input.clone();
        guard.listen(window, "keyup", move |event| {
            if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
                handler.key_up(&key.key());
            }
        })?;
        let handler = input.clone();
        guard.listen(canvas, "mousedown", move |event| {
            if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                if handler.mouse_down(mouse.button()) {
                    event.prevent_default();
                }
            }
        })?;
        let handler = input.clone();
        guard.listen(canvas, "mouseup", move |event| {
            if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                handler.mouse_up(mouse.button());
            }
        })?;
        let handler = input;
        guard.listen(canvas, "mousemove", move |event| {
            if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                let pointer = glam::Vec2::new(mouse.offset_x() as f32, mouse.offset_y() as f32);
                handler.mouse_move(pointer);
            }
        })?;
        // right button is the special attack, not a menu
        guard.listen(canvas, "contextmenu", |event| event.prevent_default())?;

        log::info!("Input listeners attached");
        Ok(guard)
    }

    fn listen(
        &mut self,
        target: &EventTarget,
        name: &'static str,
        callback: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(callback);
        target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
        self.listeners.push((target.clone(), name, closure));
        Ok(())
    }
}

impl Drop for InputListeners {
    fn drop(&mut self) {
        for (target, name, closure) in &self.listeners {
            let _ = target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
        log::debug!("Input listeners removed");
    }
}
