use std::{
    cell::{Cell, RefCell},
    f32::consts::TAU,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use glam::{Affine3A, UVec2, Vec2, Vec3, Vec3A, Vec3Swizzles};

use crate::{
    config::PanelConfig,
    panel::{
        PanelBackend, PanelDescriptor, PanelEventHandler, PanelFactory, PanelRenderTarget,
        surface::Surface,
    },
};

use super::{
    common::{Ray, raycast_plane},
    input::{AxisEvent, BaseEvent, MOUSE_POINTER, PointerEvent, PointerId, TargetId},
    movement::{MoveHandlerRegistry, MovementSynthesizer, PointerMoveHandler, PointerMoveTargets},
    redirect::{FrameContext, PanelInputRedirector},
    selector::{InputModality, SourceSelector, TrackingDrivers},
    source::{ControllerRaySource, InteractorHit, PerspectiveCamera, RayInteractor},
};

pub const PANEL_TARGET: TargetId = TargetId(0);

const CLICK_INTERVAL: u64 = 45;

/// Controller whose ray runs down the `-Z` axis of its pose and is tested
/// against a fixed set of quads.
pub struct PoseRayInteractor {
    pose: Cell<Affine3A>,
    targets: RefCell<Vec<(TargetId, Surface)>>,
}

impl PoseRayInteractor {
    pub fn new(targets: Vec<(TargetId, Surface)>) -> Self {
        Self {
            pose: Cell::new(Affine3A::IDENTITY),
            targets: RefCell::new(targets),
        }
    }

    /// Adds the quad for `id`, or replaces it if it is already known.
    pub fn set_target(&self, id: TargetId, surface: Surface) {
        let mut targets = self.targets.borrow_mut();
        if let Some(entry) = targets.iter_mut().find(|(t, _)| *t == id) {
            entry.1 = surface;
        } else {
            targets.push((id, surface));
        }
    }

    pub fn set_pose(&self, pose: Affine3A) {
        self.pose.set(pose);
    }

    pub fn aim_at(&self, eye: Vec3, target: Vec3) {
        self.set_pose(Affine3A::look_at_rh(eye, target, Vec3::Y).inverse());
    }
}

impl RayInteractor for PoseRayInteractor {
    fn current_3d_hit(&self) -> Option<InteractorHit> {
        let pose = self.pose.get();
        let ray = Ray::new(pose.translation, pose.transform_vector3a(Vec3A::NEG_Z));

        self.targets
            .borrow()
            .iter()
            .filter_map(|(id, surface)| {
                let plane = surface.plane();
                let dist = raycast_plane(&ray, &plane)?;
                let point = ray.point_at(dist);

                let local = surface.world_to_local(point).xy();
                if local.x.abs() > 0.5 || local.y.abs() > 0.5 {
                    return None;
                }

                Some(InteractorHit {
                    point,
                    normal: plane.normal,
                    distance: dist,
                    target: Some(*id),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PanelStats {
    pub moves: usize,
    pub inside: usize,
    pub clicks: usize,
    pub scrolls: usize,
    pub other: usize,
    pub last_panel_pos: Option<Vec2>,
}

/// Stands in for a real UI panel: logs what arrives and keeps counts.
pub struct LoggingPanel {
    name: Arc<str>,
    size: UVec2,
    scale: f32,
    viewport_height: f32,
    stats: Rc<RefCell<PanelStats>>,
}

impl LoggingPanel {
    /// Panel pixel under `event`, measured from the top-left, if inside.
    fn panel_pos(&self, event: &PointerEvent) -> Option<Vec2> {
        let pos = Vec2::new(event.position.x, self.viewport_height - event.position.y);
        let size = self.size.as_vec2();
        (pos.cmpge(Vec2::ZERO).all() && pos.cmple(size).all()).then_some(pos / self.scale)
    }
}

impl PanelEventHandler for LoggingPanel {
    fn on_pointer_move(&mut self, event: &PointerEvent) {
        let pos = self.panel_pos(event);
        let mut stats = self.stats.borrow_mut();
        stats.moves += 1;
        if pos.is_some() {
            stats.inside += 1;
            stats.last_panel_pos = pos;
        }
    }

    fn on_pointer_down(&mut self, event: &PointerEvent) {
        match self.panel_pos(event) {
            Some(pos) => {
                log::info!("{}: click at {:.1}, {:.1}", self.name, pos.x, pos.y);
                self.stats.borrow_mut().clicks += 1;
            }
            None => log::debug!("{}: click outside the panel", self.name),
        }
    }

    fn on_pointer_up(&mut self, _event: &PointerEvent) {}

    fn on_scroll(&mut self, event: &PointerEvent) {
        log::debug!("{}: scroll {}", self.name, event.scroll_delta);
        self.stats.borrow_mut().scrolls += 1;
    }

    fn on_submit(&mut self, _event: &BaseEvent) {
        self.stats.borrow_mut().other += 1;
    }

    fn on_cancel(&mut self, _event: &BaseEvent) {
        self.stats.borrow_mut().other += 1;
    }

    fn on_move(&mut self, event: &AxisEvent) {
        log::debug!("{}: navigate {:?}", self.name, event.move_dir);
        self.stats.borrow_mut().other += 1;
    }

    fn on_select(&mut self, _event: &BaseEvent) {
        self.stats.borrow_mut().other += 1;
    }

    fn on_deselect(&mut self, _event: &BaseEvent) {
        self.stats.borrow_mut().other += 1;
    }
}

impl PanelRenderTarget for LoggingPanel {
    fn target_size(&self) -> UVec2 {
        self.size
    }

    fn resize_target(&mut self, size: UVec2) {
        self.size = size;
    }

    fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    fn mark_dirty(&mut self) {
        log::debug!("{}: repaint requested", self.name);
    }
}

pub struct LoggingPanelFactory {
    pub viewport_height: f32,
    pub stats: Rc<RefCell<PanelStats>>,
}

impl PanelFactory for LoggingPanelFactory {
    fn create(&mut self, desc: &PanelDescriptor) -> anyhow::Result<Box<dyn PanelBackend>> {
        Ok(Box::new(LoggingPanel {
            name: desc.name.clone(),
            size: desc.size,
            scale: desc.scale,
            viewport_height: self.viewport_height,
            stats: self.stats.clone(),
        }))
    }
}

/// There is no headset here, the camera never moves on its own.
struct HeadlessTracking;

impl TrackingDrivers for HeadlessTracking {
    fn set_tracking_enabled(&mut self, enabled: bool) {
        log::debug!("Tracking drivers enabled: {enabled}");
    }
}

/// Routes synthetic moves aimed at the panel quad into the redirector and
/// everything else to the scene's own handlers.
struct SceneMoveTargets<'a, 'c> {
    redirector: &'a mut PanelInputRedirector,
    scene: &'a mut MoveHandlerRegistry,
    ctx: FrameContext<'c>,
}

impl PointerMoveTargets for SceneMoveTargets<'_, '_> {
    fn dispatch_pointer_move(&mut self, target: TargetId, event: &PointerEvent) -> usize {
        if target == PANEL_TARGET {
            self.redirector.on_pointer_move(&self.ctx, event.clone());
            1
        } else {
            self.scene.dispatch_pointer_move(target, event)
        }
    }
}

/// Drives one panel with scripted input for a number of frames.
pub struct HeadlessHost {
    modality: InputModality,
    camera: PerspectiveCamera,
    viewport: Vec2,
    redirector: PanelInputRedirector,
    controller: Rc<PoseRayInteractor>,
    controller_pointer: PointerId,
    synthesizer: MovementSynthesizer,
    scene: MoveHandlerRegistry,
    stats: Rc<RefCell<PanelStats>>,
    frame: u64,
}

impl HeadlessHost {
    pub fn new(config: &PanelConfig, modality: InputModality) -> anyhow::Result<Self> {
        let viewport = config.viewport.as_vec2();
        let camera = PerspectiveCamera::look_at(
            Vec3::ZERO,
            config.position,
            config.camera_fov.to_radians(),
            viewport,
        );

        let mut redirector = PanelInputRedirector::from_config(config);
        let stats = Rc::new(RefCell::new(PanelStats::default()));
        redirector.rebuild_panel(&mut LoggingPanelFactory {
            viewport_height: viewport.y,
            stats: stats.clone(),
        })?;

        let controller = Rc::new(PoseRayInteractor::new(vec![(
            PANEL_TARGET,
            redirector.surface().clone(),
        )]));
        let controller_pointer = PointerId(config.controller_pointer_id);
        let mut synthesizer = MovementSynthesizer::new(Some(controller.clone()), controller_pointer);
        synthesizer.set_enabled(config.synthesize_movement);

        let modality = SourceSelector::new(modality).apply(
            &mut redirector,
            Some(ControllerRaySource::new(controller.clone())),
            &mut synthesizer,
            &mut HeadlessTracking,
        );

        Ok(Self {
            modality,
            camera,
            viewport,
            redirector,
            controller,
            controller_pointer,
            synthesizer,
            scene: MoveHandlerRegistry::default(),
            stats,
            frame: 0,
        })
    }

    pub fn stats(&self) -> PanelStats {
        *self.stats.borrow()
    }

    pub const fn redirector(&self) -> &PanelInputRedirector {
        &self.redirector
    }

    pub const fn redirector_mut(&mut self) -> &mut PanelInputRedirector {
        &mut self.redirector
    }

    /// Places another quad the controller ray can hit. `id` must not be
    /// [`PANEL_TARGET`].
    pub fn add_scene_object(
        &mut self,
        id: TargetId,
        surface: Surface,
        handler: Box<dyn PointerMoveHandler>,
    ) {
        self.controller.set_target(id, surface);
        self.scene.attach(id, handler);
    }

    /// Point on the panel the script aims at this frame, in local quad space.
    fn script_local(&self) -> Vec2 {
        let t = self.frame as f32 / 120.0 * TAU;
        Vec2::new(0.45 * t.sin(), 0.45 * (2.0 * t).cos())
    }

    fn scripted_event(&self) -> PointerEvent {
        let local = self.script_local();
        match self.modality {
            InputModality::Mouse => {
                let world = self.redirector.surface().local_to_world(local.extend(0.0).into());
                let screen = project(&self.camera, self.viewport, world);
                PointerEvent::new(MOUSE_POINTER, screen)
            }
            InputModality::Controller => {
                let world = self.redirector.surface().local_to_world(local.extend(0.0).into());
                self.controller
                    .aim_at(Vec3::new(0.2, -0.3, 0.0), Vec3::from(world));
                PointerEvent::new(self.controller_pointer, Vec2::ZERO)
            }
        }
    }

    pub fn step(&mut self) {
        self.frame += 1;
        self.redirector.begin_frame();
        // the panel may have been moved or resized since the last frame
        self.controller
            .set_target(PANEL_TARGET, self.redirector.surface().clone());

        let ctx = FrameContext::new(Some(&self.camera), self.viewport.y);
        let event = self.scripted_event();

        let event = self.redirector.on_pointer_move(&ctx, event);
        if self.frame % CLICK_INTERVAL == 0 {
            // down and up are delivered for the same event, like a tap
            let event = self.redirector.on_pointer_down(&ctx, event);
            self.redirector.on_pointer_up(&ctx, event);
            self.redirector.on_submit(&BaseEvent::new());
        }

        if self.modality == InputModality::Controller {
            self.synthesizer.tick(&mut SceneMoveTargets {
                redirector: &mut self.redirector,
                scene: &mut self.scene,
                ctx,
            });
        }

        self.redirector.end_frame();
    }

    pub fn run(&mut self, frames: u64, running: &Arc<AtomicBool>) -> PanelStats {
        for _ in 0..frames {
            if !running.load(Ordering::Relaxed) {
                log::info!("Interrupted after {} frames", self.frame);
                break;
            }
            self.step();
        }
        self.stats()
    }
}

/// World point to screen pixels, bottom-left origin.
fn project(camera: &PerspectiveCamera, viewport: Vec2, world: Vec3A) -> Vec2 {
    let local = camera.pose.inverse().transform_point3a(world);
    let half_h = (camera.fov_y * 0.5).tan();
    let aspect = viewport.x / viewport.y;
    let ndc = Vec2::new(
        local.x / (-local.z * half_h * aspect),
        local.y / (-local.z * half_h),
    );
    (ndc + Vec2::ONE) * 0.5 * viewport
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::source::EventCamera;

    #[test]
    fn project_inverts_unproject() {
        let camera = PerspectiveCamera::look_at(
            Vec3::new(0.3, 0.1, 1.0),
            Vec3::new(0.0, 0.0, -2.0),
            1.0,
            Vec2::new(1920.0, 1080.0),
        );
        let screen = Vec2::new(400.0, 800.0);
        let world = camera.screen_to_world_point(screen.extend(3.0));
        let back = project(&camera, camera.viewport, world);
        assert!(back.abs_diff_eq(screen, 1e-2));
    }

    #[test]
    fn pose_interactor_hits_quad_only_inside() {
        let surface = Surface::new(UVec2::new(1000, 1000), 1000.0)
            .with_pose(glam::Quat::IDENTITY, Vec3A::new(0.0, 0.0, -2.0));
        let interactor = PoseRayInteractor::new(vec![(PANEL_TARGET, surface)]);

        interactor.aim_at(Vec3::ZERO, Vec3::new(0.2, 0.1, -2.0));
        let hit = interactor.current_3d_hit().unwrap();
        assert_eq!(hit.target, Some(PANEL_TARGET));
        assert!(hit.point.abs_diff_eq(Vec3A::new(0.2, 0.1, -2.0), 1e-4));

        interactor.aim_at(Vec3::ZERO, Vec3::new(0.8, 0.0, -2.0));
        assert!(interactor.current_3d_hit().is_none());
    }

    #[test]
    fn mouse_session_clicks_inside_panel() {
        let config = PanelConfig::default();
        let mut host = HeadlessHost::new(&config, InputModality::Mouse).unwrap();
        let running = Arc::new(AtomicBool::new(true));

        let stats = host.run(CLICK_INTERVAL * 2, &running);
        assert_eq!(stats.moves, (CLICK_INTERVAL * 2) as usize);
        assert_eq!(stats.inside, stats.moves);
        assert_eq!(stats.clicks, 2);
        assert!(host.redirector().processed().is_empty());
    }

    #[test]
    fn controller_session_gets_synthetic_moves() {
        let config = PanelConfig::default();
        let mut host = HeadlessHost::new(&config, InputModality::Controller).unwrap();
        let running = Arc::new(AtomicBool::new(true));

        let stats = host.run(10, &running);
        // one scripted move and one synthetic move per frame
        assert_eq!(stats.moves, 20);
        assert_eq!(stats.inside, 20);
    }

    #[test]
    fn controller_follows_moved_panel() {
        let config = PanelConfig::default();
        let mut host = HeadlessHost::new(&config, InputModality::Controller).unwrap();
        let running = Arc::new(AtomicBool::new(true));

        host.redirector_mut()
            .set_pose(glam::Quat::IDENTITY, Vec3A::new(0.8, 0.4, -3.0));
        host.redirector_mut().set_panel_width(640);

        let stats = host.run(10, &running);
        assert_eq!(stats.moves, 20);
        assert_eq!(stats.inside, 20);
    }

    struct CountMoves(Rc<Cell<usize>>);

    impl PointerMoveHandler for CountMoves {
        fn on_pointer_move(&mut self, _event: &PointerEvent) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn synthetic_moves_reach_scene_objects() {
        let config = PanelConfig::default();
        let mut host = HeadlessHost::new(&config, InputModality::Controller).unwrap();
        let running = Arc::new(AtomicBool::new(true));

        // a large quad between the controller and the panel
        let blocker = Surface::new(UVec2::new(4000, 4000), 1000.0)
            .with_pose(glam::Quat::IDENTITY, Vec3A::new(0.0, 0.0, -1.0));
        let count = Rc::new(Cell::new(0));
        host.add_scene_object(TargetId(7), blocker, Box::new(CountMoves(count.clone())));

        let stats = host.run(10, &running);
        assert_eq!(count.get(), 10);
        // only the scripted moves reach the panel
        assert_eq!(stats.moves, 10);
    }

    #[test]
    fn stops_when_interrupted() {
        let config = PanelConfig::default();
        let mut host = HeadlessHost::new(&config, InputModality::Mouse).unwrap();
        let running = Arc::new(AtomicBool::new(false));

        let stats = host.run(100, &running);
        assert_eq!(stats.moves, 0);
    }
}
