//! Entity records and atomic creation
//!
//! A game entity is one physics body plus one or more render entities. The
//! [`SpawnTransaction`] guard creates them in that order and undoes all of it
//! unless committed, so a failed render step never strands a body.

use std::collections::HashMap;

use crate::error::{EntityError, PhysicsError};
use crate::particles::EmitterId;
use crate::physics::{ArcherPhysics, BodyHandle, EntityRef, Role};
use crate::renderer::{AnimationOptions, Placement, SpriteRenderer};
use crate::sprites::ArcherPose;

/// Player animation slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerAnimation {
    Idle,
    Run,
    Shoot,
}

impl PlayerAnimation {
    pub const ALL: [PlayerAnimation; 3] = [
        PlayerAnimation::Idle,
        PlayerAnimation::Run,
        PlayerAnimation::Shoot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerAnimation::Idle => "idle",
            PlayerAnimation::Run => "run",
            PlayerAnimation::Shoot => "shoot",
        }
    }

    /// Frame sequence backing this slot
    pub fn pose(&self) -> ArcherPose {
        match self {
            PlayerAnimation::Idle => ArcherPose::Idle,
            PlayerAnimation::Run => ArcherPose::Run,
            PlayerAnimation::Shoot => ArcherPose::Fire,
        }
    }

    /// Shooting plays once
    pub fn looping(&self) -> bool {
        !matches!(self, PlayerAnimation::Shoot)
    }

    pub fn render_id(&self, player: &str) -> String {
        format!("player-{}-{player}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PlayerEntity {
    pub body: BodyHandle,
    pub sprite_id: String,
    pub animation_ids: HashMap<PlayerAnimation, String>,
    pub current_animation: PlayerAnimation,
}

impl PlayerEntity {
    /// Every render id, sprite first
    pub fn render_ids(&self) -> Vec<String> {
        let mut ids = vec![self.sprite_id.clone()];
        for slot in PlayerAnimation::ALL {
            if let Some(id) = self.animation_ids.get(&slot) {
                ids.push(id.clone());
            }
        }
        ids
    }
}

#[derive(Debug, Clone)]
pub struct ArrowEntity {
    pub body: BodyHandle,
    pub sprite_id: String,
    /// Shooter; hits on the owner are ignored
    pub owner: Option<String>,
    pub damage: f32,
    pub trail: Option<EmitterId>,
}

#[derive(Debug, Clone)]
pub struct ObstacleEntity {
    pub body: BodyHandle,
    pub sprite_id: String,
}

#[derive(Debug, Clone)]
pub struct PowerupEntity {
    pub body: BodyHandle,
    pub sprite_id: String,
    pub animation_id: String,
    pub kind: String,
}

pub fn sprite_id(role: Role, id: &str) -> String {
    format!("{}-sprite-{id}", role.as_str())
}

/// Remove a role's physics body
pub(crate) fn remove_body(physics: &mut ArcherPhysics, role: Role, id: &str) {
    match role {
        Role::Player => physics.remove_player(id),
        Role::Arrow => physics.remove_arrow(id),
        Role::Obstacle => physics.remove_obstacle(id),
        Role::Powerup => physics.remove_powerup(id),
    }
}

/// Creation guard: body first, then render entities, rolled back on drop
/// unless [`commit`](Self::commit) is reached
pub(crate) struct SpawnTransaction<'a> {
    physics: &'a mut ArcherPhysics,
    renderer: &'a mut SpriteRenderer,
    entity: EntityRef,
    body: BodyHandle,
    sprites: Vec<String>,
    animations: Vec<String>,
    committed: bool,
}

impl<'a> SpawnTransaction<'a> {
    pub fn begin(
        physics: &'a mut ArcherPhysics,
        renderer: &'a mut SpriteRenderer,
        entity: EntityRef,
        create_body: impl FnOnce(&mut ArcherPhysics) -> Result<BodyHandle, PhysicsError>,
    ) -> Result<Self, EntityError> {
        let body = create_body(physics).map_err(|source| EntityError::Physics {
            entity: entity.clone(),
            source,
        })?;
        Ok(Self {
            physics,
            renderer,
            entity,
            body,
            sprites: Vec::new(),
            animations: Vec::new(),
            committed: false,
        })
    }

    pub fn renderer(&mut self) -> &mut SpriteRenderer {
        &mut *self.renderer
    }

    pub fn sprite(&mut self, id: &str, texture: &str, placement: &Placement) -> Result<(), EntityError> {
        match self.renderer.create_sprite(id, texture, placement) {
            Some(_) => {
                self.sprites.push(id.to_owned());
                Ok(())
            }
            None => Err(self.render_error(id)),
        }
    }

    pub fn animation(
        &mut self,
        id: &str,
        options: &AnimationOptions,
        placement: &Placement,
    ) -> Result<(), EntityError> {
        match self.renderer.create_animation(id, options, placement) {
            Some(_) => {
                self.animations.push(id.to_owned());
                Ok(())
            }
            None => Err(self.render_error(id)),
        }
    }

    fn render_error(&self, resource: &str) -> EntityError {
        EntityError::Render {
            entity: self.entity.clone(),
            resource: resource.to_owned(),
        }
    }

    pub fn commit(mut self) -> BodyHandle {
        self.committed = true;
        self.body
    }
}

impl Drop for SpawnTransaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        for id in &self.sprites {
            self.renderer.remove_sprite(id);
        }
        for id in &self.animations {
            self.renderer.remove_animation(id);
        }
        remove_body(&mut *self.physics, self.entity.role, &self.entity.id);
        log::warn!("Rolled back creation of {}", self.entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use glam::Vec2;

    fn setup() -> (ArcherPhysics, SpriteRenderer) {
        let physics = ArcherPhysics::new(&Settings::default());
        let mut renderer = SpriteRenderer::new(800, 600, 0);
        renderer.bake_texture("arrow", 32, 8, |_| {});
        (physics, renderer)
    }

    #[test]
    fn test_commit_keeps_everything() {
        let (mut physics, mut renderer) = setup();
        let walls = physics.body_count();
        let mut tx = SpawnTransaction::begin(
            &mut physics,
            &mut renderer,
            EntityRef::new(Role::Arrow, "a1"),
            |p| Ok(p.create_arrow("a1", Vec2::splat(100.0), 0.0, Vec2::X)),
        )
        .unwrap();
        tx.sprite("arrow-sprite-a1", "arrow", &Placement::default()).unwrap();
        tx.commit();
        assert_eq!(physics.body_count(), walls + 1);
        assert!(renderer.contains_sprite("arrow-sprite-a1"));
    }

    #[test]
    fn test_render_failure_rolls_back_body_and_sprites() {
        let (mut physics, mut renderer) = setup();
        let walls = physics.body_count();
        let result = (|| {
            let mut tx = SpawnTransaction::begin(
                &mut physics,
                &mut renderer,
                EntityRef::new(Role::Arrow, "a1"),
                |p| Ok(p.create_arrow("a1", Vec2::splat(100.0), 0.0, Vec2::X)),
            )?;
            tx.sprite("arrow-sprite-a1", "arrow", &Placement::default())?;
            tx.sprite("arrow-glow-a1", "missing-texture", &Placement::default())?;
            Ok::<_, EntityError>(tx.commit())
        })();

        match result {
            Err(EntityError::Render { resource, .. }) => assert_eq!(resource, "arrow-glow-a1"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(physics.body_count(), walls);
        assert!(physics.arrow_state("a1").is_none());
        assert!(!renderer.contains_sprite("arrow-sprite-a1"));
    }

    #[test]
    fn test_physics_failure_creates_nothing() {
        let (mut physics, mut renderer) = setup();
        let walls = physics.body_count();
        let failed = matches!(
            SpawnTransaction::begin(
                &mut physics,
                &mut renderer,
                EntityRef::new(Role::Obstacle, "o1"),
                |_| {
                    Err(PhysicsError::DegeneratePolygon {
                        sides: 2,
                        radius: 0.0,
                    })
                },
            ),
            Err(EntityError::Physics { .. })
        );
        assert!(failed);
        assert_eq!(physics.body_count(), walls);
    }

    #[test]
    fn test_animation_render_ids() {
        assert_eq!(PlayerAnimation::Run.render_id("p1"), "player-run-p1");
        assert_eq!(sprite_id(Role::Arrow, "a"), "arrow-sprite-a");
        assert!(!PlayerAnimation::Shoot.looping());
    }
}
