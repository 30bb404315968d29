//! Deduplication, retargeting and merging of exported clip animations
//!
//! The same clip can be exported from several roots. An exact repeat is a
//! no-op, a repeat on another root reuses the earlier channels and points
//! them at the new nodes, and with merging enabled clips of equal name share
//! one animation.

use hashbrown::HashMap;

use crate::clip::ClipId;
use crate::scene::{NodeHandle, ObjectRef, SceneLookup};
use crate::schema::{Animation, Channel};

/// A clip played at one speed, the unit that is baked once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipKey {
    pub clip: ClipId,
    speed_bits: u32,
}

impl ClipKey {
    pub fn new(clip: ClipId, speed: f32) -> Self {
        Self {
            clip,
            speed_bits: speed.to_bits(),
        }
    }

    pub fn speed(&self) -> f32 {
        f32::from_bits(self.speed_bits)
    }
}

/// Where the channels of a clip export go
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationSlot {
    /// Already exported for this root; nothing to add
    Done(usize),
    /// Splice into the existing animation at this index
    Merge(usize),
    /// Build a new animation, starting from a copy of an earlier export when `cloned`
    Fresh { animation: Animation, cloned: bool },
}

/// Session-scoped caches of exported clips
#[derive(Debug, Default)]
pub struct AnimationMerger {
    by_root: HashMap<(ClipKey, NodeHandle), usize>,
    by_clip: HashMap<ClipKey, usize>,
    exported_paths: HashMap<(ClipKey, String), NodeHandle>,
}

impl AnimationMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide where a clip export lands
    pub fn begin(
        &self,
        key: ClipKey,
        root: NodeHandle,
        name: &str,
        animations: &[Animation],
        merge_by_name: bool,
    ) -> AnimationSlot {
        if let Some(&index) = self.by_root.get(&(key, root)) {
            return AnimationSlot::Done(index);
        }

        if merge_by_name {
            if let Some(index) = animations
                .iter()
                .position(|a| a.name.as_deref() == Some(name))
            {
                return AnimationSlot::Merge(index);
            }
        }

        if let Some(previous) = self.by_clip.get(&key).and_then(|&i| animations.get(i)) {
            return AnimationSlot::Fresh {
                animation: previous.clone(),
                cloned: true,
            };
        }

        AnimationSlot::Fresh {
            animation: Animation::named(name),
            cloned: false,
        }
    }

    /// Node a binding path of this clip was first exported against
    pub fn exported_target(&self, key: ClipKey, path: &str) -> Option<NodeHandle> {
        self.exported_paths.get(&(key, path.to_string())).copied()
    }

    /// Remember a finished export
    pub fn commit(
        &mut self,
        key: ClipKey,
        root: NodeHandle,
        index: usize,
        paths: impl IntoIterator<Item = (String, NodeHandle)>,
    ) {
        self.by_root.insert((key, root), index);
        self.by_clip.entry(key).or_insert(index);
        for (path, node) in paths {
            self.exported_paths.entry((key, path)).or_insert(node);
        }
    }
}

/// Whether a channel animates `node` or an object attached to it
fn targets_node(
    channel: &Channel,
    node: NodeHandle,
    node_index: Option<u32>,
    scene: &dyn SceneLookup,
) -> bool {
    match &channel.pointer {
        Some(binding) => scene.owner_node(binding.object) == Some(node),
        None => node_index.is_some() && channel.target.node == node_index,
    }
}

fn retarget_channel(
    channel: &Channel,
    node: NodeHandle,
    node_index: Option<u32>,
    scene: &dyn SceneLookup,
) -> Option<Channel> {
    let mut channel = channel.clone();
    let pointer = match &channel.pointer {
        Some(binding) => Some(binding.retarget(node, scene)?),
        None => None,
    };
    if pointer.is_some() {
        channel.pointer = pointer;
    } else {
        channel.target.node = Some(node_index?);
    }
    Some(channel)
}

/// Point the channels animating `from` at `to`
///
/// With `duplicate` the originals stay and retargeted copies sharing their
/// samplers are appended. Channels without an equivalent on `to` are dropped
/// (or, with `duplicate`, not copied). Returns the number of retargeted channels.
pub fn retarget_channels(
    animation: &mut Animation,
    from: NodeHandle,
    to: NodeHandle,
    scene: &dyn SceneLookup,
    duplicate: bool,
) -> usize {
    let from_index = scene.index_of(ObjectRef::node(from));
    let to_index = scene.index_of(ObjectRef::node(to));

    let channels = std::mem::take(&mut animation.channels);
    let mut kept = Vec::with_capacity(channels.len());
    let mut copies = Vec::new();
    let mut moved = 0;

    for channel in channels {
        if !targets_node(&channel, from, from_index, scene) {
            kept.push(channel);
            continue;
        }
        let retargeted = retarget_channel(&channel, to, to_index, scene);
        moved += usize::from(retargeted.is_some());
        if duplicate {
            kept.push(channel);
            copies.extend(retargeted);
        } else {
            kept.extend(retargeted);
        }
    }

    kept.extend(copies);
    animation.channels = kept;
    if !duplicate {
        animation.compact_samplers();
    }
    moved
}

/// Drop every channel animating `node`; returns how many were removed
pub fn remove_channels(animation: &mut Animation, node: NodeHandle, scene: &dyn SceneLookup) -> usize {
    let node_index = scene.index_of(ObjectRef::node(node));
    let before = animation.channels.len();
    animation
        .channels
        .retain(|c| !targets_node(c, node, node_index, scene));
    animation.compact_samplers();
    before - animation.channels.len()
}

/// `name`, or `name (n)` with the smallest free `n`
pub fn unique_name(animations: &[Animation], name: &str) -> String {
    let taken = |candidate: &str| animations.iter().any(|a| a.name.as_deref() == Some(candidate));
    if !taken(name) {
        return name.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{} ({})", name, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerBinding;
    use crate::scene::{ObjectKind, SceneIndex};
    use crate::schema::{AnimationSampler, ChannelTarget, Interpolation};

    const A: NodeHandle = NodeHandle(10);
    const B: NodeHandle = NodeHandle(20);
    const OTHER: NodeHandle = NodeHandle(30);
    const LIGHT_A: ObjectRef = ObjectRef::new(ObjectKind::Light, 1);
    const LIGHT_B: ObjectRef = ObjectRef::new(ObjectKind::Light, 2);

    fn scene() -> SceneIndex {
        let mut scene = SceneIndex::new();
        scene
            .add_node(A, Some(0))
            .add_node(B, Some(1))
            .add_node(OTHER, Some(2))
            .attach(A, LIGHT_A, Some(0))
            .attach(B, LIGHT_B, Some(1));
        scene
    }

    fn sampler(i: u32) -> AnimationSampler {
        AnimationSampler {
            input: i * 2,
            interpolation: Interpolation::Linear,
            output: i * 2 + 1,
        }
    }

    fn node_channel(sampler: u32, node: u32, path: &str) -> Channel {
        Channel {
            sampler,
            target: ChannelTarget {
                node: Some(node),
                path: path.to_string(),
                extensions: None,
            },
            pointer: None,
        }
    }

    fn pointer_channel(sampler: u32, object: ObjectRef, path: &str) -> Channel {
        Channel {
            sampler,
            target: ChannelTarget {
                node: None,
                path: "pointer".to_string(),
                extensions: None,
            },
            pointer: Some(PointerBinding::new(object, path)),
        }
    }

    /// translation on A, intensity on A's light, scale on OTHER
    fn animation() -> Animation {
        Animation {
            name: Some("Walk".to_string()),
            channels: vec![
                node_channel(0, 0, "translation"),
                pointer_channel(1, LIGHT_A, "intensity"),
                node_channel(2, 2, "scale"),
            ],
            samplers: vec![sampler(0), sampler(1), sampler(2)],
        }
    }

    #[test]
    fn test_retarget_moves_node_and_pointer_channels() {
        let scene = scene();
        let mut anim = animation();
        let moved = retarget_channels(&mut anim, A, B, &scene, false);

        assert_eq!(moved, 2);
        assert_eq!(anim.channels.len(), 3);
        assert_eq!(anim.channels[0].target.node, Some(1));
        assert_eq!(anim.channels[1].pointer.as_ref().unwrap().object, LIGHT_B);
        assert_eq!(anim.channels[2].target.node, Some(2));
        assert_eq!(anim.samplers.len(), 3);
    }

    #[test]
    fn test_retarget_drops_channels_without_equivalent() {
        let scene = scene();
        let mut anim = animation();
        // OTHER carries no light
        let moved = retarget_channels(&mut anim, A, OTHER, &scene, false);

        assert_eq!(moved, 1);
        assert_eq!(anim.channels.len(), 2);
        assert!(anim.channels.iter().all(|c| c.pointer.is_none()));
        // the light's sampler is gone and indices are dense again
        assert_eq!(anim.samplers, vec![sampler(0), sampler(2)]);
        assert_eq!(anim.channels[1].sampler, 1);
    }

    #[test]
    fn test_duplicate_retarget_keeps_originals() {
        let scene = scene();
        let mut anim = animation();
        retarget_channels(&mut anim, A, B, &scene, true);

        assert_eq!(anim.channels.len(), 5);
        assert_eq!(anim.channels[0].target.node, Some(0));
        assert_eq!(anim.channels[3].target.node, Some(1));
        // copies share the original samplers
        assert_eq!(anim.channels[3].sampler, anim.channels[0].sampler);
        assert_eq!(anim.samplers.len(), 3);
    }

    #[test]
    fn test_remove_channels_compacts_samplers() {
        let scene = scene();
        let mut anim = animation();
        assert_eq!(remove_channels(&mut anim, A, &scene), 2);
        assert_eq!(anim.channels.len(), 1);
        assert_eq!(anim.channels[0].sampler, 0);
        assert_eq!(anim.samplers, vec![sampler(2)]);
    }

    #[test]
    fn test_begin_prefers_exact_then_name_then_clip() {
        let key = ClipKey::new(ClipId(1), 1.0);
        let mut merger = AnimationMerger::new();
        let animations = vec![animation()];

        match merger.begin(key, A, "Walk", &animations, false) {
            AnimationSlot::Fresh { cloned, .. } => assert!(!cloned),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            merger.begin(key, A, "Walk", &animations, true),
            AnimationSlot::Merge(0)
        );

        merger.commit(key, A, 0, [(String::new(), A)]);
        assert_eq!(
            merger.begin(key, A, "Walk", &animations, true),
            AnimationSlot::Done(0)
        );
        match merger.begin(key, B, "Walk", &animations, false) {
            AnimationSlot::Fresh { animation, cloned } => {
                assert!(cloned);
                assert_eq!(animation.channels.len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(merger.exported_target(key, ""), Some(A));

        // another speed is another bake
        let faster = ClipKey::new(ClipId(1), 2.0);
        assert!(matches!(
            merger.begin(faster, A, "Walk", &animations, false),
            AnimationSlot::Fresh { cloned: false, .. }
        ));
        assert_eq!(faster.speed(), 2.0);
    }

    #[test]
    fn test_unique_names() {
        let mut animations = vec![Animation::named("Walk")];
        assert_eq!(unique_name(&animations, "Run"), "Run");
        assert_eq!(unique_name(&animations, "Walk"), "Walk (1)");
        animations.push(Animation::named("Walk (1)"));
        assert_eq!(unique_name(&animations, "Walk"), "Walk (2)");
    }
}
