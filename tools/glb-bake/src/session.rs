//! Export session: the single owner of the buffer and every emitted list
//!
//! A session is driven one step at a time (`export_mesh`, `export_clip`) and
//! consumed by [`ExportSession::finish`]. Cancellation is checked between
//! steps only, so an accessor is never left half written.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;

use crate::accessor::AccessorEncoder;
use crate::bake::{bake_property, BakeOptions};
use crate::clip::{AnimationClip, TargetCurveSet};
use crate::document::{Buffer, Document, Mesh};
use crate::error::{ExportError, ExportReport, Result, SkipReason};
use crate::mapping::PropertyTable;
use crate::merge::{remove_channels, retarget_channels, unique_name, AnimationMerger, AnimationSlot, ClipKey};
use crate::mesh::PrimitiveBuilder;
use crate::pointer::ANIMATION_POINTER_EXTENSION;
use crate::router::{ExportState, PropertyRouter};
use crate::scene::{NodeHandle, ObjectRef, SceneLookup};
use crate::schema::{Animation, ChannelTargetExtensions, PointerExtension};
use crate::settings::ExportSettings;

/// Shared flag a host sets to stop the session at the next step
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything a finished session produced
#[derive(Debug)]
pub struct ExportOutput {
    pub document: Document,
    /// Contents of buffer 0, padded to 4 bytes
    pub bin: Vec<u8>,
    pub report: ExportReport,
    /// Extensions each animated material must declare
    pub material_extensions: HashMap<ObjectRef, BTreeSet<String>>,
    /// Final position of every animation handed out by `export_clip`; `None`
    /// once pointer resolution left it without channels
    pub animation_indices: Vec<Option<usize>>,
}

impl ExportOutput {
    pub fn to_glb(&self) -> Result<Vec<u8>> {
        self.document.to_glb(&self.bin)
    }

    /// Index into `document.animations` for a handle returned during the session
    pub fn animation_index(&self, handle: usize) -> Option<usize> {
        self.animation_indices.get(handle).copied().flatten()
    }
}

/// Which animation a clip export writes into
enum Destination {
    Merge(usize),
    Fresh,
}

pub struct ExportSession<'a> {
    settings: ExportSettings,
    table: PropertyTable,
    scene: &'a dyn SceneLookup,
    state: ExportState,
    animations: Vec<Animation>,
    meshes: Vec<Mesh>,
    merger: AnimationMerger,
    cancel: CancellationToken,
}

impl<'a> ExportSession<'a> {
    pub fn new(settings: ExportSettings, table: PropertyTable, scene: &'a dyn SceneLookup) -> Self {
        Self {
            settings,
            table,
            scene,
            state: ExportState::new(),
            animations: Vec::new(),
            meshes: Vec::new(),
            merger: AnimationMerger::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Direct access for collaborators encoding their own arrays
    pub fn encoder(&mut self) -> &mut AccessorEncoder {
        &mut self.state.encoder
    }

    pub fn report(&self) -> &ExportReport {
        &self.state.report
    }

    pub fn report_mut(&mut self) -> &mut ExportReport {
        &mut self.state.report
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        Ok(())
    }

    /// Encode a mesh's primitives and return its mesh index
    pub fn export_mesh(&mut self, name: &str, primitives: &[PrimitiveBuilder]) -> Result<u32> {
        self.check_cancelled()?;

        let mut mesh = Mesh {
            name: Some(name.to_string()),
            ..Default::default()
        };
        for primitive in primitives {
            let encoded = primitive
                .encode(&mut self.state.encoder)
                .map_err(|e| e.in_mesh(name))?;
            mesh.primitives.push(encoded);
        }

        let index = self.meshes.len() as u32;
        tracing::debug!(
            "mesh \"{}\": {} primitive(s) as mesh {}",
            name,
            mesh.primitives.len(),
            index
        );
        self.meshes.push(mesh);
        Ok(index)
    }

    /// Export a clip as played from `root` at `speed`
    ///
    /// Returns the index of the animation holding the clip's channels, or
    /// `None` when nothing could be exported. Map it through
    /// [`ExportOutput::animation_index`] after `finish`.
    pub fn export_clip(
        &mut self,
        clip: &AnimationClip,
        root: NodeHandle,
        speed: f32,
    ) -> Result<Option<usize>> {
        self.check_cancelled()?;

        let speed = self.settings.effective_speed(speed);
        let key = ClipKey::new(clip.id, speed);
        let slot = self.merger.begin(
            key,
            root,
            &clip.name,
            &self.animations,
            self.settings.merge_clips_with_matching_names,
        );

        let (mut animation, destination) = match slot {
            AnimationSlot::Done(index) => {
                tracing::debug!("clip \"{}\" already exported for this root", clip.name);
                return Ok(Some(index));
            }
            AnimationSlot::Merge(index) => (
                std::mem::take(&mut self.animations[index]),
                Destination::Merge(index),
            ),
            AnimationSlot::Fresh { animation, cloned } => {
                if cloned {
                    tracing::debug!("clip \"{}\" reuses an earlier export", clip.name);
                }
                (animation, Destination::Fresh)
            }
        };

        let merging = matches!(destination, Destination::Merge(_));
        let paths = self.export_bindings(clip, key, speed, &mut animation, merging);

        let paths = match (paths, destination) {
            (Err(err), Destination::Merge(index)) => {
                self.animations[index] = animation;
                return Err(err.in_clip(&clip.name));
            }
            (Err(err), Destination::Fresh) => return Err(err.in_clip(&clip.name)),
            (Ok(paths), Destination::Merge(index)) => {
                self.animations[index] = animation;
                self.merger.commit(key, root, index, paths);
                return Ok(Some(index));
            }
            (Ok(paths), Destination::Fresh) => paths,
        };

        if animation.channels.is_empty() {
            tracing::debug!("clip \"{}\" produced no channels", clip.name);
            return Ok(None);
        }

        let name = if self.settings.unique_animation_names {
            unique_name(&self.animations, &clip.name)
        } else {
            clip.name.clone()
        };
        animation.name = Some(name);

        let index = self.animations.len();
        tracing::info!(
            "animation \"{}\": {} channel(s), {} sampler(s)",
            animation.name.as_deref().unwrap_or_default(),
            animation.channels.len(),
            animation.samplers.len()
        );
        self.animations.push(animation);
        self.merger.commit(key, root, index, paths);
        Ok(Some(index))
    }

    /// Bake, retarget or drop every binding of the clip
    ///
    /// Returns the paths that were baked fresh, with the node they targeted.
    fn export_bindings(
        &mut self,
        clip: &AnimationClip,
        key: ClipKey,
        speed: f32,
        animation: &mut Animation,
        merging: bool,
    ) -> Result<Vec<(String, NodeHandle)>> {
        let options = BakeOptions::new(clip.length)
            .with_sample_rate(self.settings.frame_rate)
            .with_speed(speed);
        let router = PropertyRouter::new(&self.table, self.scene)
            .with_animation_pointer(self.settings.use_animation_pointer)
            .with_keyframe_reduction(self.settings.reduce_keyframes);

        let mut baked_paths = Vec::new();
        for binding in &clip.bindings {
            let exportable = binding.node.filter(|&node| self.is_exportable(node));

            if let Some(previous) = self.merger.exported_target(key, &binding.path) {
                match exportable {
                    Some(node) => {
                        let moved = retarget_channels(animation, previous, node, self.scene, merging);
                        tracing::debug!(
                            "{}/{}: {} channel(s) retargeted",
                            clip.name,
                            binding.path,
                            moved
                        );
                    }
                    None if !merging => {
                        let removed = remove_channels(animation, previous, self.scene);
                        tracing::debug!(
                            "{}/{}: {} channel(s) removed",
                            clip.name,
                            binding.path,
                            removed
                        );
                    }
                    None => {}
                }
                continue;
            }

            let Some(node) = exportable else {
                skip_binding(self.scene, &mut self.state.report, clip, binding);
                continue;
            };

            baked_paths.push((binding.path.clone(), node));
            for property in &binding.properties {
                let context = format!("{}/{}/{}", clip.name, binding.path, property.property);
                match bake_property(property, &options) {
                    Ok(baked) => {
                        router.route(&mut self.state, animation, &context, property, baked)?;
                    }
                    Err(reason) => self.state.report.skip(context, reason),
                }
            }
        }
        Ok(baked_paths)
    }

    fn is_exportable(&self, node: NodeHandle) -> bool {
        self.scene.index_of(ObjectRef::node(node)).is_some()
            && (self.settings.export_disabled_nodes || self.scene.is_active(node))
    }

    /// Resolve pointer channels and assemble the document
    pub fn finish(self) -> Result<ExportOutput> {
        self.check_cancelled()?;

        let ExportSession {
            scene,
            mut state,
            mut animations,
            meshes,
            ..
        } = self;

        for animation in &mut animations {
            resolve_pointers(animation, scene, &mut state.report);
        }
        let mut next = 0;
        let animation_indices: Vec<Option<usize>> = animations
            .iter()
            .map(|a| {
                if a.channels.is_empty() {
                    return None;
                }
                next += 1;
                Some(next - 1)
            })
            .collect();
        animations.retain(|a| !a.channels.is_empty());
        if !animations.iter().flat_map(|a| &a.channels).any(|c| c.is_pointer()) {
            state.extensions_used.remove(ANIMATION_POINTER_EXTENSION);
        }

        let ExportState {
            encoder,
            extensions_used,
            material_extensions,
            report,
        } = state;
        let (bin, buffer_views, accessors) = encoder.finish();

        let mut document = Document::new();
        if !bin.is_empty() {
            let byte_length =
                u32::try_from(bin.len()).map_err(|_| ExportError::BufferTooLarge(bin.len()))?;
            document.buffers.push(Buffer {
                byte_length,
                uri: None,
            });
        }
        document.buffer_views = buffer_views;
        document.accessors = accessors;
        document.meshes = meshes;
        document.animations = animations;
        document.extensions_used = extensions_used;

        if !report.is_clean() {
            tracing::info!("export finished with {} skipped propert(ies)", report.warnings.len());
        }

        Ok(ExportOutput {
            document,
            bin,
            report,
            material_extensions,
            animation_indices,
        })
    }
}

fn skip_binding(
    scene: &dyn SceneLookup,
    report: &mut ExportReport,
    clip: &AnimationClip,
    binding: &TargetCurveSet,
) {
    match binding.node {
        Some(node) if scene.index_of(ObjectRef::node(node)).is_some() => {
            tracing::debug!("{}/{}: node is disabled", clip.name, binding.path);
        }
        _ => report.skip(
            format!("{}/{}", clip.name, binding.path),
            SkipReason::TargetNotExported,
        ),
    }
}

/// Write JSON pointers into pointer channels, dropping those that cannot resolve
fn resolve_pointers(animation: &mut Animation, scene: &dyn SceneLookup, report: &mut ExportReport) {
    let name = animation.name.clone().unwrap_or_default();
    let before = animation.channels.len();
    animation.channels.retain_mut(|channel| {
        let Some(binding) = &channel.pointer else {
            return true;
        };
        match binding.resolve(scene) {
            Some(pointer) => {
                channel.target.extensions = Some(ChannelTargetExtensions {
                    animation_pointer: PointerExtension { pointer },
                });
                true
            }
            None => {
                report.skip(
                    format!("{}/{}", name, binding.property),
                    SkipReason::UnresolvedPointer,
                );
                false
            }
        }
    });
    if animation.channels.len() != before {
        animation.compact_samplers();
    }
}
