//! Render read-out: packs live particles into GPU-ready instance data

use crate::assets::TextureHandle;
use crate::declaration::BlendMode;
use crate::effect::EffectNode;
use crate::rand::RandomSource;
use bytemuck::{Pod, Zeroable};
use plume_core::{DefinitionId, Vec2};

/// Per-particle instance data.
/// 48 bytes, three vec4 rows.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub pos_size: [f32; 4],       // xy = position, zw = size
    pub color: [f32; 4],          // rgba
    pub rotation_frame: [f32; 4], // x = rotation, y = frame, zw = texture anchor
}

/// One node's slice of the instance buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawBatch {
    pub definition: DefinitionId,
    pub node: u64,
    pub texture: TextureHandle,
    pub blend_mode: BlendMode,
    pub cells: [u32; 2],
    pub start: usize,
    pub count: usize,
}

impl DrawBatch {
    pub fn instances<'a>(&self, buffer: &'a [ParticleInstance]) -> &'a [ParticleInstance] {
        &buffer[self.start..self.start + self.count]
    }
}

/// Append one instance per live particle of `node` and its descendants,
/// and one batch per node that has particles. Parameter jitter on scale is
/// re-rolled per call, so `rng` is consumed.
pub fn pack_instances<R: RandomSource + ?Sized>(
    node: &EffectNode,
    rng: &mut R,
    instances: &mut Vec<ParticleInstance>,
    batches: &mut Vec<DrawBatch>,
) {
    pack_node(node, rng, instances, batches);
    for child in node.children() {
        pack_instances(child, rng, instances, batches);
    }
}

fn pack_node<R: RandomSource + ?Sized>(
    node: &EffectNode,
    rng: &mut R,
    instances: &mut Vec<ParticleInstance>,
    batches: &mut Vec<DrawBatch>,
) {
    let Some(params) = node.params() else {
        return;
    };
    let count = node.active_particles();
    if count == 0 {
        return;
    }

    let e = node.life_fraction();
    let cells = params.animation_cells();
    let parent_offset = if params.relative_to_parent {
        node.transform().position
    } else {
        Vec2::ZERO
    };

    let start = instances.len();
    instances.reserve(count);
    for index in 0..count {
        let Some(p) = node.particle(index) else {
            continue;
        };
        let f = p.life_fraction();

        let mut color = params.color.evaluate(f);
        match params.blend_mode {
            BlendMode::Alpha => color = color.premultiplied(),
            BlendMode::Additive => {
                color = color.premultiplied();
                color.a = 0.0;
            }
            BlendMode::Opaque => {}
        }

        let scale = p.scale * params.scale.get(rng, e, f);
        let width = scale * params.scale_x.get(rng, e, f);
        let height = scale * params.scale_y.get(rng, e, f);

        let frame = if cells > 1 && params.texture_frame_time > 0.0 {
            (p.age / params.texture_frame_time) as u32 % cells
        } else {
            0
        };

        let position = p.position + parent_offset;
        instances.push(ParticleInstance {
            pos_size: [position.x, position.y, width, height],
            color: color.to_array(),
            rotation_frame: [
                p.rotation,
                frame as f32,
                params.texture_anchor.x,
                params.texture_anchor.y,
            ],
        });
    }

    batches.push(DrawBatch {
        definition: node.definition_id(),
        node: node.instance(),
        texture: params.texture,
        blend_mode: params.blend_mode,
        cells: params.texture_cells,
        start,
        count: instances.len() - start,
    });
}
