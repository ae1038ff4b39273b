//! Built-in shader programs
//!
//! Both programs share the `Shading` uniform block, laid out with std140 to
//! match [`ShadingUniforms`](super::ShadingUniforms) byte for byte.

use super::ProgramSource;

macro_rules! shading_block {
    () => {
        "layout(std140) uniform Shading {
    mat4 view_matrix;
    mat4 object_matrix;
    mat4 normal_matrix;
    vec4 light_position;
    vec4 light_color;
    vec4 ambient_color;
    vec4 diffuse_color;
    vec4 specular_color;
    float shininess;
    float has_light;
};
"
    };
}

macro_rules! blinn_phong {
    () => {
        "vec3 shade(vec3 base, float ambient_strength) {
    vec3 normal = normalize(frag_normal);
    vec3 ambient = ambient_color.rgb * ambient_strength;
    if (has_light < 0.5) {
        return ambient + base * ambient_strength;
    }
    vec3 to_light = normalize(light_position.xyz - frag_position);
    vec3 to_eye = normalize(-frag_position);
    vec3 halfway = normalize(to_light + to_eye);
    float diffuse = max(dot(to_light, normal), 0.0);
    float specular = 0.0;
    if (dot(to_light, normal) > 0.0) {
        specular = 0.5 * pow(max(dot(normal, halfway), 0.0), shininess);
    }
    return (ambient + diffuse * base + specular * specular_color.rgb) * light_color.rgb;
}
"
    };
}

pub(crate) const SOLID: ProgramSource = ProgramSource {
    name: "trellis.solid",
    vertex: concat!(
        "#version 330 core\n",
        shading_block!(),
        "in vec3 position;
in vec3 normal;
out vec3 frag_position;
out vec3 frag_normal;

void main() {
    vec4 world = object_matrix * vec4(position, 1.0);
    frag_position = world.xyz;
    frag_normal = (normal_matrix * vec4(normal, 0.0)).xyz;
    gl_Position = view_matrix * world;
}
"
    ),
    fragment: concat!(
        "#version 330 core\n",
        shading_block!(),
        "in vec3 frag_position;
in vec3 frag_normal;
out vec4 out_color;
",
        blinn_phong!(),
        "
void main() {
    out_color = vec4(shade(diffuse_color.rgb, 0.3), 1.0);
}
"
    ),
};

pub(crate) const TEXTURED: ProgramSource = ProgramSource {
    name: "trellis.textured",
    vertex: concat!(
        "#version 330 core\n",
        shading_block!(),
        "in vec3 position;
in vec3 normal;
in vec2 tex_coord;
out vec3 frag_position;
out vec3 frag_normal;
out vec2 frag_tex_coord;

void main() {
    vec4 world = object_matrix * vec4(position, 1.0);
    frag_position = world.xyz;
    frag_normal = (normal_matrix * vec4(normal, 0.0)).xyz;
    frag_tex_coord = tex_coord;
    gl_Position = view_matrix * world;
}
"
    ),
    fragment: concat!(
        "#version 330 core\n",
        shading_block!(),
        "in vec3 frag_position;
in vec3 frag_normal;
in vec2 frag_tex_coord;
uniform sampler2D surface;
out vec4 out_color;
",
        blinn_phong!(),
        "
void main() {
    vec4 texel = texture(surface, frag_tex_coord);
    out_color = vec4(shade(texel.rgb, 0.1), 1.0);
}
"
    ),
};
