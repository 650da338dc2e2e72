//! Condition and operator opcode tables.
//!
//! Numeric codes are the wire format of compiled scripts and must not be
//! renumbered. Each opcode carries its operand layout; the interpreter uses the
//! same layout to skip operands when an object lookup misses, so execution and
//! skipping cannot disagree on widths.

use thiserror::Error;

/// Kinds of operands that follow an opcode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// One 16-bit word.
    Word,
    /// Length-prefixed object name token.
    Object,
    /// Length-prefixed NUL-terminated string.
    String,
    /// `op, arg` assignment expression.
    Eval,
    /// `op, arg` comparison or `-1, count, (lo, hi)*count` interval list.
    Test,
    /// `mul, div, add` scaling of a frame dimension.
    Transform,
    /// Two transforms followed by a comparison coordinate.
    Span,
    /// Object mode word, followed by a weight word when the mode is random.
    Mode,
}

impl Operand {
    /// Encoded size when it does not depend on the data.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Operand::Word => Some(2),
            Operand::Eval => Some(4),
            Operand::Transform => Some(6),
            Operand::Span => Some(14),
            Operand::Object | Operand::String | Operand::Test | Operand::Mode => None,
        }
    }
}

/// Total encoded size of a layout, `None` as soon as one operand is variable.
pub fn fixed_width(operands: &[Operand]) -> Option<usize> {
    operands
        .iter()
        .try_fold(0usize, |acc, operand| Some(acc + operand.fixed_size()?))
}

/// Operands left to skip once the first object token has been consumed.
pub fn operands_after_object(operands: &'static [Operand]) -> &'static [Operand] {
    match operands.iter().position(|op| *op == Operand::Object) {
        Some(pos) => &operands[pos + 1..],
        None => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown opcode {0}")]
pub struct UnknownOpcode(pub i16);

macro_rules! opcode_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident = $code:literal => $mnemonic:literal [$($operand:ident),*], )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i16)]
        pub enum $name {
            $( $variant = $code, )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            pub const fn code(self) -> i16 {
                self as i16
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $mnemonic, )+
                }
            }

            pub const fn operands(self) -> &'static [Operand] {
                match self {
                    $( $name::$variant => &[$(Operand::$operand),*], )+
                }
            }

            /// Operands to skip when the opcode's object lookup misses.
            pub fn miss_skip(self) -> &'static [Operand] {
                operands_after_object(self.operands())
            }
        }

        impl TryFrom<i16> for $name {
            type Error = UnknownOpcode;

            fn try_from(value: i16) -> Result<Self, Self::Error> {
                match value {
                    $( $code => Ok($name::$variant), )+
                    other => Err(UnknownOpcode(other)),
                }
            }
        }
    };
}

opcode_table! {
    /// Condition opcodes evaluated before a statement's operators.
    pub enum ConditionOp {
        True = 10 => "true" [],
        Chance = 100 => "chance" [Word],
        KeyPressed = 500 => "key_pressed" [Word],
        KeyNotPressed = 510 => "key_not_pressed" [Word],
        MouseButtons = 1100 => "mouse_buttons" [Word],
        IsRunningObject = 2500 => "is_running_object" [Object],
        PrevStateIs = 3000 => "prev_state_is" [Object, Word],
        StateIs = 3010 => "state_is" [Object, Word],
        InRect = 3050 => "in_rect" [Object, Word, Word, Word, Word],
        PrevSpanX = 3100 => "prev_span_x" [Object, Span],
        SpanX = 3105 => "span_x" [Object, Span],
        PrevSpanY = 3110 => "prev_span_y" [Object, Span],
        SpanY = 3150 => "span_y" [Object, Span],
        PrevFlipIs = 3300 => "prev_flip_is" [Object, Word],
        FlipIs = 3310 => "flip_is" [Object, Word],
        PrevFrameTest = 3400 => "prev_frame_test" [Object, Test],
        FrameTest = 3410 => "frame_test" [Object, Test],
        PrevMotionTest = 3500 => "prev_motion_test" [Object, Test],
        MotionTest = 3510 => "motion_test" [Object, Test],
        ObjectVarTest = 3600 => "object_var_test" [Word, Object, Test],
        ObjectsOverlapX = 3700 => "objects_overlap_x" [Object, Transform, Transform, Object, Transform, Transform],
        ObjectsOverlapY = 3710 => "objects_overlap_y" [Object, Transform, Transform, Object, Transform, Transform],
        MotionYModulo = 4110 => "motion_y_modulo" [Object, Word, Word],
        VarTest = 6000 => "var_test" [Word, Test],
        BagActionIs = 6500 => "bag_action_is" [Word],
        InBox = 7000 => "in_box" [Word, Object, Transform, Transform, Transform, Transform],
        NotInBox = 7500 => "not_in_box" [Word, Object, Transform, Transform, Transform, Transform],
        NotCrossingBox = 8500 => "not_crossing_box" [Word, Object, Transform, Transform, Object, Transform, Transform],
        BagObjectIs = 10000 => "bag_object_is" [String],
        LifeBarShown = 20000 => "life_bar_shown" [],
        LifeBarHidden = 20010 => "life_bar_hidden" [],
        DialogueEnded = 25000 => "dialogue_ended" [Test],
        NextSceneStaged = 30000 => "next_scene_staged" [Word],
    }
}

opcode_table! {
    /// Operator opcodes run when every condition of a statement held.
    pub enum OperatorOp {
        Break = 100 => "break" [],
        InitObject = 3000 => "init_object" [Object, Word],
        EvalSelfX = 3100 => "eval_self_x" [Transform, Eval],
        EvalSelfY = 3110 => "eval_self_y" [Transform, Eval],
        EvalX = 3120 => "eval_x" [Object, Eval],
        EvalY = 3130 => "eval_y" [Object, Eval],
        EvalZ = 3200 => "eval_z" [Object, Eval],
        SetFlip = 3300 => "set_flip" [Object, Word],
        SetMotionFrame = 3400 => "set_motion_frame" [Object, Word, Word],
        SetMotionFrameDx = 3410 => "set_motion_frame_dx" [Object, Word, Word, Word, Word],
        SetMotionFrameDxDy = 3430 => "set_motion_frame_dx_dy" [Object, Word, Word, Word, Word],
        AlignFrameGridX = 3440 => "align_frame_grid_x" [Object, Transform, Transform, Word, Word],
        AlignFrameGridXY = 3460 => "align_frame_grid_xy" [Object, Transform, Transform, Transform, Transform, Word, Word],
        AlignFrameGridXAbsY = 3480 => "align_frame_grid_x_abs_y" [Object, Transform, Transform, Word, Word, Word, Word],
        SetMotion = 3500 => "set_motion" [Object, Word],
        SetMotionDxDy = 3530 => "set_motion_dx_dy" [Object, Word, Word, Word],
        AlignMotionGridX = 3540 => "align_motion_grid_x" [Object, Transform, Transform, Word],
        AlignMotionGridXY = 3560 => "align_motion_grid_xy" [Object, Transform, Transform, Transform, Transform, Word],
        AlignMotionGridXAbsY = 3580 => "align_motion_grid_x_abs_y" [Object, Transform, Transform, Word, Word, Word],
        EvalObjectVar = 4000 => "eval_object_var" [Word, Object, Eval],
        TranslateX = 4100 => "translate_x" [Object, Word, Word, Word, Word],
        TranslateY = 4200 => "translate_y" [Object, Word, Word, Word, Word],
        SetMode = 5000 => "set_mode" [Object, Mode],
        SetInitPos = 5100 => "set_init_pos" [Object, Word, Word],
        SetInitPosFromSelf = 5110 => "set_init_pos_from_self" [Object, Transform, Transform],
        EvalInitX = 5112 => "eval_init_x" [Object, Eval],
        EvalInitY = 5114 => "eval_init_y" [Object, Eval],
        EvalInitZ = 5200 => "eval_init_z" [Object, Eval],
        SetInitFlip = 5300 => "set_init_flip" [Object, Word],
        SetCel = 5400 => "set_cel" [Object, Word, Word],
        ResetCel = 5500 => "reset_cel" [Object, Word],
        EvalVar = 6000 => "eval_var" [Word, Eval],
        StoreSceneNumber = 6100 => "store_scene_number" [Word],
        DisableBox = 7000 => "disable_box" [Word, Word],
        EnableBox = 7010 => "enable_box" [Word, Word],
        EvalBoxesX = 7100 => "eval_boxes_x" [Eval],
        EvalBoxesY = 7110 => "eval_boxes_y" [Eval],
        FitBoxToObject = 7200 => "fit_box_to_object" [Word, Word, Object, Transform, Transform, Transform, Transform],
        ClipBoxes = 7300 => "clip_boxes" [Word, Word, Word, Word],
        SaveStatus = 8000 => "save_status" [Word],
        AddToBag = 10000 => "add_to_bag" [Object],
        RemoveFromBag = 11000 => "remove_from_bag" [String],
        PlaySound = 20000 => "play_sound" [Word, Word],
        PlaySoundStrict = 20010 => "play_sound_strict" [Word, Word],
        StartDialogue = 25000 => "start_dialogue" [String, String, String, String],
        SwitchSceneClearBoxes = 30000 => "switch_scene_clear_boxes" [Word],
        SwitchSceneCopyBoxes = 30010 => "switch_scene_copy_boxes" [Word],
    }
}
